//! Polymorphic knowledge-link storage (spec §3: an association between an
//! entity in `{project, task, sprint}` and a knowledge item in `{page,
//! code_example, source}`). The `knowledge_links` table carries no foreign
//! keys — `entity_id`/`item_id` span several other tables depending on
//! their `*_type` column — so nothing at the database level can cascade a
//! delete into it. Callers that remove an entity or item are responsible
//! for cleaning up the links that reference it; see
//! [`crate::sources::delete_source`].

use uuid::Uuid;

use crate::error::{from_sqlx, BackendResult};
use crate::model::{KnowledgeEntity, KnowledgeItem, KnowledgeLink};
use crate::pool::DbPool;

fn entity_parts(entity: KnowledgeEntity) -> (&'static str, Uuid) {
    match entity {
        KnowledgeEntity::Project(id) => ("project", id.as_uuid()),
        KnowledgeEntity::Task(id) => ("task", id.as_uuid()),
        KnowledgeEntity::Sprint(id) => ("sprint", id.as_uuid()),
    }
}

fn item_parts(item: KnowledgeItem) -> (&'static str, Uuid) {
    match item {
        KnowledgeItem::Page(id) => ("page", id.as_uuid()),
        KnowledgeItem::CodeExample(id) => ("code_example", id.as_uuid()),
        KnowledgeItem::Source(id) => ("source", id.as_uuid()),
    }
}

fn entity_from_parts(entity_type: &str, entity_id: Uuid) -> Option<KnowledgeEntity> {
    match entity_type {
        "project" => Some(KnowledgeEntity::Project(entity_id.into())),
        "task" => Some(KnowledgeEntity::Task(entity_id.into())),
        "sprint" => Some(KnowledgeEntity::Sprint(entity_id.into())),
        _ => None,
    }
}

fn item_from_parts(item_type: &str, item_id: Uuid) -> Option<KnowledgeItem> {
    match item_type {
        "page" => Some(KnowledgeItem::Page(item_id.into())),
        "code_example" => Some(KnowledgeItem::CodeExample(item_id.into())),
        "source" => Some(KnowledgeItem::Source(item_id.into())),
        _ => None,
    }
}

pub async fn put_knowledge_link(pool: &DbPool, link: &KnowledgeLink) -> BackendResult<()> {
    let (entity_type, entity_id) = entity_parts(link.entity);
    let (item_type, item_id) = item_parts(link.item);
    sqlx::query(
        "insert into knowledge_links (id, entity_type, entity_id, item_type, item_id, relevance_score) \
         values ($1,$2,$3,$4,$5,$6) \
         on conflict (id) do update set relevance_score = excluded.relevance_score",
    )
    .bind(link.id)
    .bind(entity_type)
    .bind(entity_id)
    .bind(item_type)
    .bind(item_id)
    .bind(link.relevance_score)
    .execute(pool)
    .await
    .map_err(|e| from_sqlx(e, "put_knowledge_link"))?;
    Ok(())
}

pub async fn get_knowledge_link(pool: &DbPool, id: Uuid) -> BackendResult<KnowledgeLink> {
    let row = sqlx::query(
        "select id, entity_type, entity_id, item_type, item_id, relevance_score \
         from knowledge_links where id = $1",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(|e| from_sqlx(e, &format!("get_knowledge_link {id}")))?;
    row_to_link(&row)
}

pub async fn list_knowledge_links_for_entity(pool: &DbPool, entity: KnowledgeEntity) -> BackendResult<Vec<KnowledgeLink>> {
    let (entity_type, entity_id) = entity_parts(entity);
    let rows = sqlx::query(
        "select id, entity_type, entity_id, item_type, item_id, relevance_score \
         from knowledge_links where entity_type = $1 and entity_id = $2 order by relevance_score desc nulls last",
    )
    .bind(entity_type)
    .bind(entity_id)
    .fetch_all(pool)
    .await
    .map_err(|e| from_sqlx(e, "list_knowledge_links_for_entity"))?;
    rows.iter().map(row_to_link).collect()
}

pub async fn delete_knowledge_link(pool: &DbPool, id: Uuid) -> BackendResult<()> {
    let result = sqlx::query("delete from knowledge_links where id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| from_sqlx(e, "delete_knowledge_link"))?;
    if result.rows_affected() == 0 {
        return Err(crate::error::BackendError::NotFound(format!("knowledge link {id}")));
    }
    Ok(())
}

/// Deletes every link pointing at `source_id` itself or at any page/code
/// example belonging to it. Must run before the `sources` row is deleted,
/// in the same transaction, since pages/code_examples cascade away with
/// it and their ids would otherwise be unrecoverable.
pub(crate) async fn delete_links_for_source(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    source_id: Uuid,
) -> BackendResult<()> {
    sqlx::query(
        "delete from knowledge_links where \
         (item_type = 'source' and item_id = $1) \
         or (item_type = 'page' and item_id in (select id from pages where source_id = $1)) \
         or (item_type = 'code_example' and item_id in (select id from code_examples where source_id = $1))",
    )
    .bind(source_id)
    .execute(&mut **tx)
    .await
    .map_err(|e| from_sqlx(e, "delete_links_for_source"))?;
    Ok(())
}

fn row_to_link(row: &sqlx::postgres::PgRow) -> BackendResult<KnowledgeLink> {
    use sqlx::Row;
    let entity_type: String = row.try_get("entity_type").map_err(|e| from_sqlx(e, "row_to_link entity_type"))?;
    let entity_id: Uuid = row.try_get("entity_id").map_err(|e| from_sqlx(e, "row_to_link entity_id"))?;
    let item_type: String = row.try_get("item_type").map_err(|e| from_sqlx(e, "row_to_link item_type"))?;
    let item_id: Uuid = row.try_get("item_id").map_err(|e| from_sqlx(e, "row_to_link item_id"))?;
    let entity = entity_from_parts(&entity_type, entity_id)
        .ok_or_else(|| crate::error::BackendError::InvalidInput(format!("unknown entity_type {entity_type}")))?;
    let item = item_from_parts(&item_type, item_id)
        .ok_or_else(|| crate::error::BackendError::InvalidInput(format!("unknown item_type {item_type}")))?;
    Ok(KnowledgeLink {
        id: row.try_get("id").map_err(|e| from_sqlx(e, "row_to_link id"))?,
        entity,
        item,
        relevance_score: row.try_get("relevance_score").map_err(|e| from_sqlx(e, "row_to_link relevance_score"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use archon_protocol::{PageId, ProjectId};

    #[test]
    fn entity_parts_round_trip_through_strings() {
        let project = KnowledgeEntity::Project(ProjectId::new());
        let (t, id) = entity_parts(project);
        assert_eq!(entity_from_parts(t, id), Some(project));
    }

    #[test]
    fn item_parts_round_trip_through_strings() {
        let page = KnowledgeItem::Page(PageId::new());
        let (t, id) = item_parts(page);
        assert_eq!(item_from_parts(t, id), Some(page));
    }
}
