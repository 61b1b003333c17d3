//! The two indexed read paths C7 depends on: cosine-similarity top-K over
//! an embedding column, and lexical rank over page content (§4.1).

use std::collections::BTreeSet;

use archon_protocol::{PageId, ProjectId, SourceId};
use sqlx::Row;

use crate::error::{from_sqlx, BackendError, BackendResult};
use crate::model::KnowledgeType;
use crate::pool::DbPool;
use crate::sources::knowledge_type_str;

#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub source_id: Option<SourceId>,
    pub project_id: Option<ProjectId>,
    pub knowledge_type: Option<KnowledgeType>,
    pub tags: BTreeSet<String>,
}

impl SearchFilters {
    fn needs_sources_join(&self) -> bool {
        self.project_id.is_some() || self.knowledge_type.is_some() || !self.tags.is_empty()
    }

    /// Appends this filter's `and ...` clauses to `sql`, binding
    /// parameters starting at `$next`. Returns the next free placeholder
    /// index.
    fn push_clauses(&self, sql: &mut String, next: &mut i32) -> Option<String> {
        let mut tags_literal = None;
        if self.needs_sources_join() {
            sql.push_str(" join sources s on s.id = p.source_id");
        }
        if self.source_id.is_some() {
            sql.push_str(&format!(" and p.source_id = ${next}"));
            *next += 1;
        }
        if self.project_id.is_some() {
            sql.push_str(&format!(" and s.project_id = ${next}"));
            *next += 1;
        }
        if self.knowledge_type.is_some() {
            sql.push_str(&format!(" and s.knowledge_type = ${next}"));
            *next += 1;
        }
        if !self.tags.is_empty() {
            sql.push_str(&format!(" and s.tags @> ${next}::jsonb"));
            *next += 1;
            tags_literal = Some(serde_json::to_string(&self.tags).unwrap());
        }
        tags_literal
    }
}

fn embeddings_table(dimension: i32) -> BackendResult<&'static str> {
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

/// Cosine similarity top-`k` at the given dimension. Similarity is
/// reported in `[-1, 1]`, descending.
pub async fn vector_search(
    pool: &DbPool,
    dimension: i32,
    query_vector: &[f32],
    k: usize,
    filters: &SearchFilters,
) -> BackendResult<Vec<(PageId, f64)>> {
    let table = embeddings_table(dimension)?;
    let vector_literal = to_pgvector_literal(query_vector);

    let mut sql = format!(
        "select e.page_id as page_id, 1 - (e.vector <=> $1::vector) as score \
         from {table} e join pages p on p.id = e.page_id where 1 = 1"
    );
    let mut next = 2;
    let tags_literal = filters.push_clauses(&mut sql, &mut next);
    sql.push_str(&format!(" order by e.vector <=> $1::vector asc limit ${next}"));

    let mut query = sqlx::query(&sql).bind(vector_literal);
    query = bind_filters(query, filters, tags_literal);
    query = query.bind(k as i64);

    let rows = query
        .fetch_all(pool)
        .await
        .map_err(|e| from_sqlx(e, "vector_search"))?;

    rows.into_iter()
        .map(|row| {
            let page_id: uuid::Uuid = row.try_get("page_id").map_err(|e| from_sqlx(e, "page_id"))?;
            let score: f64 = row.try_get("score").map_err(|e| from_sqlx(e, "score"))?;
            Ok((PageId(page_id), score))
        })
        .collect()
}

/// Lexical rank over `pages.content_tsv`, descending; rank is an opaque
/// non-negative number (`ts_rank_cd`'s native scale).
pub async fn text_search(
    pool: &DbPool,
    query: &str,
    k: usize,
    filters: &SearchFilters,
) -> BackendResult<Vec<(PageId, f64)>> {
    let mut sql = String::from(
        "select p.id as page_id, ts_rank_cd(p.content_tsv, plainto_tsquery('english', $1)) as rank \
         from pages p where p.content_tsv @@ plainto_tsquery('english', $1)",
    );
    let mut next = 2;
    let tags_literal = filters.push_clauses(&mut sql, &mut next);
    sql.push_str(&format!(" order by rank desc limit ${next}"));

    let mut q = sqlx::query(&sql).bind(query);
    q = bind_filters(q, filters, tags_literal);
    q = q.bind(k as i64);

    let rows = q
        .fetch_all(pool)
        .await
        .map_err(|e| from_sqlx(e, "text_search"))?;

    rows.into_iter()
        .map(|row| {
            let page_id: uuid::Uuid = row.try_get("page_id").map_err(|e| from_sqlx(e, "page_id"))?;
            let rank: f64 = row.try_get("rank").map_err(|e| from_sqlx(e, "rank"))?;
            Ok((PageId(page_id), rank))
        })
        .collect()
}

fn bind_filters<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    filters: &SearchFilters,
    tags_literal: Option<String>,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    if let Some(source_id) = filters.source_id {
        query = query.bind(source_id.as_uuid());
    }
    if let Some(project_id) = filters.project_id {
        query = query.bind(project_id.as_uuid());
    }
    if let Some(kt) = filters.knowledge_type {
        query = query.bind(knowledge_type_str(kt));
    }
    if let Some(tags) = tags_literal {
        query = query.bind(tags);
    }
    query
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unconfigured_dimension() {
        assert!(embeddings_table(999).is_err());
    }

    #[test]
    fn pgvector_literal_format() {
        assert_eq!(to_pgvector_literal(&[1.0, 2.5, -3.0]), "[1,2.5,-3]");
    }

    #[test]
    fn filters_with_tags_need_sources_join() {
        let mut filters = SearchFilters::default();
        assert!(!filters.needs_sources_join());
        filters.tags.insert("rust".to_string());
        assert!(filters.needs_sources_join());
    }
}
