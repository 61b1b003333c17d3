//! The retrieval engine's single entry point (spec §4.7): short-query
//! guard, embed+cache, vector/lexical candidate fetch, RRF fusion,
//! optional rerank, result cache, and failure degradation.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use archon_cache::{fingerprint, EmbeddingCache, TtlCache};
use archon_db::search::{text_search, vector_search, SearchFilters};
use archon_db::sources::{get_pages, normalize};
use archon_db::model::Page;
use archon_db::DbPool;
use archon_protocol::PageId;
use archon_providers::ProviderGateway;
use sha2::{Digest, Sha256};

use crate::error::RetrievalError;
use crate::fusion::fuse;
use crate::result::{MatchType, SearchEnvelope, SearchResult};

const SHORT_QUERY_MIN_CHARS: usize = 4;
const RESULT_CACHE_TTL: Duration = Duration::from_secs(300);
const RERANK_WINDOW_CAP: usize = 30;
const RERANK_WINDOW_MULTIPLIER: usize = 3;

pub struct RetrievalEngine {
    pool: DbPool,
    gateway: Arc<ProviderGateway>,
    embedding_cache: Arc<dyn EmbeddingCache>,
    result_cache: TtlCache<String, SearchEnvelope>,
}

impl RetrievalEngine {
    pub fn new(
        pool: DbPool,
        gateway: Arc<ProviderGateway>,
        embedding_cache: Arc<dyn EmbeddingCache>,
    ) -> Self {
        Self {
            pool,
            gateway,
            embedding_cache,
            result_cache: TtlCache::new(RESULT_CACHE_TTL),
        }
    }

    pub async fn search(
        &self,
        query: &str,
        filters: SearchFilters,
        k: usize,
    ) -> Result<SearchEnvelope, RetrievalError> {
        if k == 0 {
            return Err(RetrievalError::InvalidRequest(
                "match_count must be greater than zero".to_string(),
            ));
        }
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(RetrievalError::InvalidRequest("query must not be empty".to_string()));
        }

        let dimension = self.gateway.embedding_dimension().ok_or_else(|| {
            RetrievalError::InvalidRequest(
                "configured embedding provider declares no dimension".to_string(),
            )
        })?;
        let model = self.gateway.embedding_model().to_string();

        let cache_key = result_cache_key(trimmed, &filters, dimension, &model);
        if let Some(cached) = self.result_cache.get(&cache_key) {
            return Ok(cached);
        }

        let candidate_k = (k * 4).max(50);
        let is_short_query = trimmed.chars().count() < SHORT_QUERY_MIN_CHARS;

        let vector_candidates = self.vector_candidates(trimmed, dimension, &model, candidate_k, &filters).await;

        let envelope = if is_short_query {
            let candidates = vector_candidates.map_err(|()| RetrievalError::VectorRequiredForShortQuery)?;
            let inputs = candidates.into_iter().map(|(id, score)| (id, score, Some(score))).collect();
            let mut results = self.assemble(inputs, MatchType::Vector).await?;
            results.truncate(k);
            SearchEnvelope { results, degraded: false }
        } else {
            let text_candidates = text_search(&self.pool, trimmed, candidate_k, &filters)
                .await
                .map_err(|_| ());

            match (vector_candidates, text_candidates) {
                (Ok(vector), Ok(text)) => {
                    let fused = fuse(&vector, &text);
                    let mut results = self.assemble(fused, MatchType::Hybrid).await?;
                    results = self.maybe_rerank(trimmed, results, k).await;
                    results.truncate(k);
                    SearchEnvelope { results, degraded: false }
                }
                (Err(()), Ok(text)) => {
                    let inputs = text.into_iter().map(|(id, score)| (id, score, None)).collect();
                    let mut results = self.assemble(inputs, MatchType::Text).await?;
                    results.truncate(k);
                    SearchEnvelope { results, degraded: true }
                }
                (Ok(vector), Err(())) => {
                    let inputs = vector.into_iter().map(|(id, score)| (id, score, Some(score))).collect();
                    let mut results = self.assemble(inputs, MatchType::Vector).await?;
                    results.truncate(k);
                    SearchEnvelope { results, degraded: true }
                }
                (Err(()), Err(())) => return Err(RetrievalError::BothBackendsUnavailable),
            }
        };

        self.result_cache.put(cache_key, envelope.clone());
        Ok(envelope)
    }

    /// Embeds `query` (via cache, falling back to the provider gateway)
    /// and fetches vector candidates. Any failure along this path — cache
    /// miss and provider error, or a storage error — collapses to `Err`
    /// so the caller can fall back to lexical-only.
    async fn vector_candidates(
        &self,
        query: &str,
        dimension: i32,
        model: &str,
        candidate_k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<(PageId, f64)>, ()> {
        let normalized = normalize(query);
        let key = fingerprint(self.gateway.embedding_provider_id(), model, dimension, &normalized);

        let vector = match self.embedding_cache.get(&key).await {
            Some(v) => v,
            None => {
                let v = self.gateway.embed_one(query).await.map_err(|e| {
                    tracing::warn!(error = %e, "query embedding failed, falling back to lexical-only");
                })?;
                self.embedding_cache.put(&key, v.clone()).await;
                v
            }
        };

        vector_search(&self.pool, dimension, &vector, candidate_k, filters)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "vector search failed, falling back to lexical-only");
            })
    }

    /// Fetches the backing pages for `candidates` and orders them by
    /// `(score desc, vector_similarity desc, chunk_number asc, page_id
    /// asc)` (spec §4.7 tie-breaks). `candidates` need not be pre-sorted;
    /// this is the single place that applies the tie-break rule.
    async fn assemble(
        &self,
        candidates: Vec<(PageId, f64, Option<f64>)>,
        match_type: MatchType,
    ) -> Result<Vec<SearchResult>, RetrievalError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<PageId> = candidates.iter().map(|(id, _, _)| *id).collect();
        let pages = get_pages(&self.pool, &ids).await?;
        let page_by_id: std::collections::HashMap<PageId, Page> =
            pages.into_iter().map(|p| (p.id, p)).collect();

        let mut enriched: Vec<(SearchResult, Option<f64>)> = Vec::with_capacity(candidates.len());
        for (page_id, score, vector_similarity) in candidates {
            let Some(page) = page_by_id.get(&page_id) else {
                // Deleted between candidate fetch and assembly; drop it.
                continue;
            };
            enriched.push((
                SearchResult {
                    page_id,
                    source_id: page.source_id,
                    url: page.url.clone(),
                    chunk_number: page.chunk_number,
                    content: page.content.clone(),
                    score,
                    match_type,
                },
                vector_similarity,
            ));
        }

        enriched.sort_by(|(a, a_sim), (b, b_sim)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    b_sim
                        .unwrap_or(f64::NEG_INFINITY)
                        .partial_cmp(&a_sim.unwrap_or(f64::NEG_INFINITY))
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| a.chunk_number.cmp(&b.chunk_number))
                .then_with(|| a.page_id.as_uuid().cmp(&b.page_id.as_uuid()))
        });

        Ok(enriched.into_iter().map(|(r, _)| r).collect())
    }

    /// Reranks the top `min(30, 3k)` fused results when a reranker is
    /// configured (spec §4.7 step 6). Silently falls back to the fused
    /// order on reranker failure.
    async fn maybe_rerank(&self, query: &str, mut results: Vec<SearchResult>, k: usize) -> Vec<SearchResult> {
        if !self.gateway.rerank_configured() || results.len() < k {
            return results;
        }
        let window = (RERANK_WINDOW_MULTIPLIER * k).min(RERANK_WINDOW_CAP).min(results.len());
        let docs: Vec<String> = results[..window].iter().map(|r| r.content.clone()).collect();

        match self.gateway.rerank(query, &docs).await {
            Ok(scored) => {
                for doc in scored {
                    if let Some(r) = results.get_mut(doc.index) {
                        r.score = doc.score;
                    }
                }
                results[..window].sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
                results
            }
            Err(e) => {
                tracing::warn!(error = %e, "rerank failed, keeping fused ranking");
                results
            }
        }
    }
}

fn result_cache_key(query: &str, filters: &SearchFilters, dimension: i32, model: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hasher.update(b"\0");
    if let Some(source_id) = filters.source_id {
        hasher.update(source_id.as_uuid().as_bytes());
    }
    hasher.update(b"\0");
    if let Some(project_id) = filters.project_id {
        hasher.update(project_id.as_uuid().as_bytes());
    }
    hasher.update(b"\0");
    if let Some(kt) = filters.knowledge_type {
        hasher.update(format!("{kt:?}").as_bytes());
    }
    hasher.update(b"\0");
    for tag in &filters.tags {
        hasher.update(tag.as_bytes());
        hasher.update(b",");
    }
    hasher.update(b"\0");
    hasher.update(dimension.to_le_bytes());
    hasher.update(b"\0");
    hasher.update(model.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_stable_and_filter_sensitive() {
        let filters_a = SearchFilters::default();
        let mut filters_b = SearchFilters::default();
        filters_b.tags.insert("rust".to_string());

        let a1 = result_cache_key("auth flow", &filters_a, 1536, "text-embedding-3-small");
        let a2 = result_cache_key("auth flow", &filters_a, 1536, "text-embedding-3-small");
        let b = result_cache_key("auth flow", &filters_b, 1536, "text-embedding-3-small");

        assert_eq!(a1, a2);
        assert_ne!(a1, b);
    }
}
