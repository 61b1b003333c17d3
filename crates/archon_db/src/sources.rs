//! Source/Page/Embedding/CodeExample storage (§4.1).

use std::collections::{BTreeSet, HashMap};

use archon_protocol::{PageId, SourceId, Timestamp};
use sqlx::Row;

use crate::error::{from_sqlx, BackendError, BackendResult};
use crate::model::{CodeExample, KnowledgeType, Page, Source};
use crate::pool::DbPool;

#[derive(Debug, Clone, Default)]
pub struct SourceFilter {
    pub project_id: Option<archon_protocol::ProjectId>,
    pub knowledge_type: Option<KnowledgeType>,
    pub include_private: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn get_source(pool: &DbPool, id: SourceId) -> BackendResult<Source> {
    let row = sqlx::query(
        "select id, display_name, origin, knowledge_type, tags, extract_code_examples, \
         project_id, is_project_private, promoted_at, promoted_by, created_at, updated_at \
         from sources where id = $1",
    )
    .bind(id.as_uuid())
    .fetch_one(pool)
    .await
    .map_err(|e| from_sqlx(e, &format!("get_source {id}")))?;
    row_to_source(&row)
}

pub async fn list_sources(pool: &DbPool, filter: SourceFilter) -> BackendResult<Vec<Source>> {
    let mut sql = String::from(
        "select id, display_name, origin, knowledge_type, tags, extract_code_examples, \
         project_id, is_project_private, promoted_at, promoted_by, created_at, updated_at \
         from sources where 1 = 1",
    );
    if filter.project_id.is_some() {
        sql.push_str(" and project_id = $1");
    }
    if !filter.include_private {
        sql.push_str(" and is_project_private = false");
    }
    sql.push_str(" order by created_at desc");
    if let Some(limit) = filter.limit {
        sql.push_str(&format!(" limit {limit}"));
    }
    if let Some(offset) = filter.offset {
        sql.push_str(&format!(" offset {offset}"));
    }

    let mut query = sqlx::query(&sql);
    if let Some(pid) = filter.project_id {
        query = query.bind(pid.as_uuid());
    }
    let rows = query
        .fetch_all(pool)
        .await
        .map_err(|e| from_sqlx(e, "list_sources"))?;
    rows.iter().map(row_to_source).collect()
}

pub async fn put_source(pool: &DbPool, source: &Source) -> BackendResult<()> {
    source
        .validate()
        .map_err(BackendError::InvalidInput)?;
    let tags = serde_json::to_value(&source.tags).unwrap();
    sqlx::query(
        "insert into sources (id, display_name, origin, knowledge_type, tags, \
         extract_code_examples, project_id, is_project_private, promoted_at, promoted_by, \
         created_at, updated_at) \
         values ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12) \
         on conflict (id) do update set \
           display_name = excluded.display_name, origin = excluded.origin, \
           knowledge_type = excluded.knowledge_type, tags = excluded.tags, \
           extract_code_examples = excluded.extract_code_examples, \
           project_id = excluded.project_id, is_project_private = excluded.is_project_private, \
           promoted_at = excluded.promoted_at, promoted_by = excluded.promoted_by, \
           updated_at = excluded.updated_at",
    )
    .bind(source.id.as_uuid())
    .bind(&source.display_name)
    .bind(&source.origin)
    .bind(knowledge_type_str(source.knowledge_type))
    .bind(tags)
    .bind(source.extract_code_examples)
    .bind(source.project_id.map(|p| p.as_uuid()))
    .bind(source.is_project_private)
    .bind(source.promoted_at.map(|t| t.as_datetime()))
    .bind(source.promoted_by.map(|s| s.as_uuid()))
    .bind(source.created_at.as_datetime())
    .bind(source.updated_at.as_datetime())
    .execute(pool)
    .await
    .map_err(|e| from_sqlx(e, "put_source"))?;
    Ok(())
}

/// Cascades to pages, embeddings, and code examples via `on delete
/// cascade` foreign keys declared in the schema. `knowledge_links` is
/// polymorphic and carries no foreign keys, so links referencing this
/// source, or any of its pages/code examples, are deleted explicitly in
/// the same transaction before the `sources` row goes away.
pub async fn delete_source(pool: &DbPool, id: SourceId) -> BackendResult<()> {
    let mut tx = pool.begin().await.map_err(|e| from_sqlx(e, "delete_source begin"))?;

    crate::knowledge_links::delete_links_for_source(&mut tx, id.as_uuid()).await?;

    let result = sqlx::query("delete from sources where id = $1")
        .bind(id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| from_sqlx(e, "delete_source"))?;
    if result.rows_affected() == 0 {
        return Err(BackendError::NotFound(format!("source {id}")));
    }

    tx.commit().await.map_err(|e| from_sqlx(e, "delete_source commit"))?;
    Ok(())
}

/// A page queued for insertion; `re_embed` is set by the caller when the
/// content hash changed relative to an existing row at the same
/// `(source_id, url, chunk_number)`.
pub struct PageInsert {
    pub source_id: SourceId,
    pub url: String,
    pub chunk_number: i32,
    pub content: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

pub struct PageInsertResult {
    pub page_id: PageId,
    pub re_embed: bool,
}

/// Atomic for the batch; duplicate `(source_id, url, chunk_number)`
/// upserts with content replacement and flags the row for re-embedding.
pub async fn insert_pages(
    pool: &DbPool,
    batch: Vec<PageInsert>,
) -> BackendResult<Vec<PageInsertResult>> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| from_sqlx(e, "insert_pages: begin"))?;
    let mut results = Vec::with_capacity(batch.len());

    for page in batch {
        let content_hash = content_hash(&page.content);
        let existing = sqlx::query("select id, content_hash from pages where source_id = $1 and url = $2 and chunk_number = $3")
            .bind(page.source_id.as_uuid())
            .bind(&page.url)
            .bind(page.chunk_number)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| from_sqlx(e, "insert_pages: lookup existing"))?;

        let (page_id, re_embed) = if let Some(existing_row) = existing {
            let id: uuid::Uuid = existing_row.try_get("id").unwrap();
            let old_hash: String = existing_row.try_get("content_hash").unwrap();
            let changed = old_hash != content_hash;
            sqlx::query(
                "update pages set content = $1, content_hash = $2, metadata = $3, updated_at = now() where id = $4",
            )
            .bind(&page.content)
            .bind(&content_hash)
            .bind(serde_json::to_value(&page.metadata).unwrap())
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| from_sqlx(e, "insert_pages: update"))?;
            (PageId(id), changed)
        } else {
            let id = PageId::new();
            sqlx::query(
                "insert into pages (id, source_id, url, chunk_number, content, content_hash, metadata) \
                 values ($1,$2,$3,$4,$5,$6,$7)",
            )
            .bind(id.as_uuid())
            .bind(page.source_id.as_uuid())
            .bind(&page.url)
            .bind(page.chunk_number)
            .bind(&page.content)
            .bind(&content_hash)
            .bind(serde_json::to_value(&page.metadata).unwrap())
            .execute(&mut *tx)
            .await
            .map_err(|e| from_sqlx(e, "insert_pages: insert"))?;
            (id, true)
        };

        results.push(PageInsertResult { page_id, re_embed });
    }

    tx.commit()
        .await
        .map_err(|e| from_sqlx(e, "insert_pages: commit"))?;
    Ok(results)
}

/// Fetches the full page rows backing a set of ranked ids, for result
/// assembly at the retrieval engine boundary. Order is not guaranteed to
/// match `ids`; callers re-sort by their own ranking.
pub async fn get_pages(pool: &DbPool, ids: &[PageId]) -> BackendResult<Vec<Page>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let uuids: Vec<uuid::Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
    let rows = sqlx::query(
        "select id, source_id, url, chunk_number, content, content_hash, metadata, \
         created_at, updated_at from pages where id = any($1)",
    )
    .bind(&uuids)
    .fetch_all(pool)
    .await
    .map_err(|e| from_sqlx(e, "get_pages"))?;

    rows.iter()
        .map(|row| {
            let metadata_json: serde_json::Value = row
                .try_get("metadata")
                .map_err(|e| from_sqlx(e, "get_pages: metadata"))?;
            let metadata: HashMap<String, serde_json::Value> =
                serde_json::from_value(metadata_json).unwrap_or_default();
            Ok(Page {
                id: PageId(row.try_get("id").map_err(|e| from_sqlx(e, "get_pages: id"))?),
                source_id: SourceId(
                    row.try_get("source_id")
                        .map_err(|e| from_sqlx(e, "get_pages: source_id"))?,
                ),
                url: row.try_get("url").map_err(|e| from_sqlx(e, "get_pages: url"))?,
                chunk_number: row
                    .try_get("chunk_number")
                    .map_err(|e| from_sqlx(e, "get_pages: chunk_number"))?,
                content: row
                    .try_get("content")
                    .map_err(|e| from_sqlx(e, "get_pages: content"))?,
                content_hash: row
                    .try_get("content_hash")
                    .map_err(|e| from_sqlx(e, "get_pages: content_hash"))?,
                metadata,
                created_at: Timestamp::from_datetime(
                    row.try_get("created_at")
                        .map_err(|e| from_sqlx(e, "get_pages: created_at"))?,
                ),
                updated_at: Timestamp::from_datetime(
                    row.try_get("updated_at")
                        .map_err(|e| from_sqlx(e, "get_pages: updated_at"))?,
                ),
            })
        })
        .collect()
}

/// Deterministic content hash over canonical whitespace-normalized
/// content, per spec §3/§8.
pub fn content_hash(content: &str) -> String {
    use sha2::{Digest, Sha256};
    let normalized = normalize(content);
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

/// Collapses runs of whitespace to a single space and trims ends. This is
/// the "canonical whitespace normalization" spec §3 requires content
/// hashing to be stable over.
pub fn normalize(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub async fn put_code_example(pool: &DbPool, example: &CodeExample) -> BackendResult<()> {
    sqlx::query(
        "insert into code_examples (id, source_id, language, content, summary) values ($1,$2,$3,$4,$5)",
    )
    .bind(example.id.as_uuid())
    .bind(example.source_id.as_uuid())
    .bind(&example.language)
    .bind(&example.content)
    .bind(&example.summary)
    .execute(pool)
    .await
    .map_err(|e| from_sqlx(e, "put_code_example"))?;
    Ok(())
}

fn page_embeddings_table(dimension: i32) -> BackendResult<&'static str> {
    match dimension {
        384 => Ok("embeddings_384"),
        768 => Ok("embeddings_768"),
        1024 => Ok("embeddings_1024"),
        1536 => Ok("embeddings_1536"),
        3072 => Ok("embeddings_3072"),
        3584 => Ok("embeddings_3584"),
        other => Err(BackendError::InvalidInput(format!(
            "no embeddings table configured for dimension {other}"
        ))),
    }
}

/// At most one embedding per `(page_id, dimension)` active at a time
/// (spec §3 invariant); an upsert replaces the prior vector for that
/// dimension, used when a re-crawl changes a chunk's content hash.
pub async fn put_page_embedding(
    pool: &DbPool,
    page_id: PageId,
    model: &str,
    dimension: i32,
    vector: &[f32],
) -> BackendResult<()> {
    let table = page_embeddings_table(dimension)?;
    let sql = format!(
        "insert into {table} (page_id, model, vector) values ($1,$2,$3) \
         on conflict (page_id) do update set model = excluded.model, vector = excluded.vector"
    );
    sqlx::query(&sql)
        .bind(page_id.as_uuid())
        .bind(model)
        .bind(to_pgvector_literal(vector))
        .execute(pool)
        .await
        .map_err(|e| from_sqlx(e, "put_page_embedding"))?;
    Ok(())
}

fn code_example_embeddings_table(dimension: i32) -> BackendResult<&'static str> {
    match dimension {
        384 => Ok("code_example_embeddings_384"),
        768 => Ok("code_example_embeddings_768"),
        1024 => Ok("code_example_embeddings_1024"),
        1536 => Ok("code_example_embeddings_1536"),
        3072 => Ok("code_example_embeddings_3072"),
        3584 => Ok("code_example_embeddings_3584"),
        other => Err(BackendError::InvalidInput(format!(
            "no code example embeddings table configured for dimension {other}"
        ))),
    }
}

/// The two embedding slots a code example carries per dimension (spec
/// §3: "embedding (by dimension)"), so retrieval can match either the
/// generated summary or the code itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeEmbeddingKind {
    Summary,
    Content,
}

impl CodeEmbeddingKind {
    fn as_str(self) -> &'static str {
        match self {
            CodeEmbeddingKind::Summary => "summary",
            CodeEmbeddingKind::Content => "content",
        }
    }
}

/// Stores a code example's embedding at `dimension` for the given
/// `kind`. At most one row per `(code_example_id, dimension, kind)`.
pub async fn put_code_example_embedding(
    pool: &DbPool,
    code_example_id: uuid::Uuid,
    model: &str,
    dimension: i32,
    kind: CodeEmbeddingKind,
    vector: &[f32],
) -> BackendResult<()> {
    let table = code_example_embeddings_table(dimension)?;
    let sql = format!(
        "insert into {table} (code_example_id, kind, model, vector) values ($1,$2,$3,$4) \
         on conflict (code_example_id, kind) do update set model = excluded.model, vector = excluded.vector"
    );
    sqlx::query(&sql)
        .bind(code_example_id)
        .bind(kind.as_str())
        .bind(model)
        .bind(to_pgvector_literal(vector))
        .execute(pool)
        .await
        .map_err(|e| from_sqlx(e, "put_code_example_embedding"))?;
    Ok(())
}

fn to_pgvector_literal(vector: &[f32]) -> String {
    let mut s = String::with_capacity(vector.len() * 8 + 2);
    s.push('[');
    for (i, v) in vector.iter().enumerate() {
        if i > 0 {
            s.push(',');
        }
        s.push_str(&v.to_string());
    }
    s.push(']');
    s
}

pub(crate) fn knowledge_type_str(kt: KnowledgeType) -> &'static str {
    match kt {
        KnowledgeType::Technical => "technical",
        KnowledgeType::Business => "business",
    }
}

fn row_to_source(row: &sqlx::postgres::PgRow) -> BackendResult<Source> {
    let knowledge_type_raw: String = row
        .try_get("knowledge_type")
        .map_err(|e| from_sqlx(e, "row_to_source: knowledge_type"))?;
    let knowledge_type = match knowledge_type_raw.as_str() {
        "technical" => KnowledgeType::Technical,
        "business" => KnowledgeType::Business,
        other => {
            return Err(BackendError::InvalidInput(format!(
                "unknown knowledge_type {other}"
            )))
        }
    };
    let tags_json: serde_json::Value = row
        .try_get("tags")
        .map_err(|e| from_sqlx(e, "row_to_source: tags"))?;
    let tags: BTreeSet<String> = serde_json::from_value(tags_json).unwrap_or_default();

    Ok(Source {
        id: SourceId(row.try_get("id").map_err(|e| from_sqlx(e, "id"))?),
        display_name: row
            .try_get("display_name")
            .map_err(|e| from_sqlx(e, "display_name"))?,
        origin: row.try_get("origin").map_err(|e| from_sqlx(e, "origin"))?,
        knowledge_type,
        tags,
        extract_code_examples: row
            .try_get("extract_code_examples")
            .map_err(|e| from_sqlx(e, "extract_code_examples"))?,
        project_id: row
            .try_get::<Option<uuid::Uuid>, _>("project_id")
            .map_err(|e| from_sqlx(e, "project_id"))?
            .map(Into::into),
        is_project_private: row
            .try_get("is_project_private")
            .map_err(|e| from_sqlx(e, "is_project_private"))?,
        promoted_at: row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>("promoted_at")
            .map_err(|e| from_sqlx(e, "promoted_at"))?
            .map(Timestamp::from_datetime),
        promoted_by: row
            .try_get::<Option<uuid::Uuid>, _>("promoted_by")
            .map_err(|e| from_sqlx(e, "promoted_by"))?
            .map(Into::into),
        created_at: Timestamp::from_datetime(
            row.try_get("created_at")
                .map_err(|e| from_sqlx(e, "created_at"))?,
        ),
        updated_at: Timestamp::from_datetime(
            row.try_get("updated_at")
                .map_err(|e| from_sqlx(e, "updated_at"))?,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_ignores_whitespace_differences() {
        assert_eq!(
            content_hash("hello   world\n\n"),
            content_hash("hello world")
        );
    }

    #[test]
    fn content_hash_is_sensitive_to_real_changes() {
        assert_ne!(content_hash("hello world"), content_hash("hello there"));
    }

    #[test]
    fn normalize_collapses_whitespace_runs() {
        assert_eq!(normalize("a\n\nb   c\t d"), "a b c d");
    }
}
