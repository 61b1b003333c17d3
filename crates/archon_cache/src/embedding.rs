//! Embedding cache (C2): maps a content fingerprint to a previously
//! computed embedding vector. Best-effort — a cache failure never fails
//! the caller; it just means the caller recomputes and tries to store.

use async_trait::async_trait;
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// sha256 over `(provider_id, model_id, dimension, normalized_text)`, per
/// spec §4.2.
pub fn fingerprint(provider_id: &str, model_id: &str, dimension: i32, normalized_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(provider_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(model_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(dimension.to_le_bytes());
    hasher.update(b"\0");
    hasher.update(normalized_text.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
pub trait EmbeddingCache: Send + Sync {
    /// Returns `None` on either a true miss or an internal failure — the
    /// cache never distinguishes the two to its caller, since both result
    /// in "go compute it".
    async fn get(&self, key: &str) -> Option<Vec<f32>>;

    /// Best-effort; a failure here is swallowed, never propagated.
    async fn put(&self, key: &str, vector: Vec<f32>);
}

/// Single-process LRU-backed implementation, used in tests and
/// single-node deployments that don't run a Redis sidecar.
pub struct InProcessEmbeddingCache {
    inner: Mutex<LruCache<String, (Vec<f32>, Instant)>>,
    ttl: Duration,
}

impl InProcessEmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity.max(1)).unwrap(),
            )),
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

#[async_trait]
impl EmbeddingCache for InProcessEmbeddingCache {
    async fn get(&self, key: &str) -> Option<Vec<f32>> {
        let mut guard = self.inner.lock().ok()?;
        let (vector, stored_at) = guard.get(key)?;
        if stored_at.elapsed() > self.ttl {
            guard.pop(key);
            return None;
        }
        Some(vector.clone())
    }

    async fn put(&self, key: &str, vector: Vec<f32>) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.put(key.to_string(), (vector, Instant::now()));
        }
    }
}

/// Redis-backed implementation for production deployments: Redis itself
/// owns TTL and LRU eviction under memory pressure (`maxmemory-policy
/// allkeys-lru`), so this implementation just issues plain GET/SETEX.
pub struct RedisEmbeddingCache {
    client: redis::Client,
    ttl_secs: u64,
}

impl RedisEmbeddingCache {
    pub fn new(redis_url: &str) -> Result<Self, redis::RedisError> {
        Ok(Self {
            client: redis::Client::open(redis_url)?,
            ttl_secs: DEFAULT_TTL.as_secs(),
        })
    }
}

#[async_trait]
impl EmbeddingCache for RedisEmbeddingCache {
    async fn get(&self, key: &str) -> Option<Vec<f32>> {
        let mut conn = self.client.get_multiplexed_async_connection().await.ok()?;
        let raw: Option<Vec<u8>> = redis::cmd("GET")
            .arg(cache_key(key))
            .query_async(&mut conn)
            .await
            .ok()?;
        raw.and_then(|bytes| bincode_decode(&bytes))
    }

    async fn put(&self, key: &str, vector: Vec<f32>) {
        let Ok(mut conn) = self.client.get_multiplexed_async_connection().await else {
            tracing::debug!("embedding cache store skipped: redis unavailable");
            return;
        };
        let encoded = bincode_encode(&vector);
        let result: redis::RedisResult<()> = redis::cmd("SETEX")
            .arg(cache_key(key))
            .arg(self.ttl_secs)
            .arg(encoded)
            .query_async(&mut conn)
            .await;
        if let Err(e) = result {
            tracing::debug!(error = %e, "embedding cache store failed, continuing without it");
        }
    }
}

fn cache_key(fingerprint: &str) -> String {
    format!("archon:embed:{fingerprint}")
}

fn bincode_encode(vector: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

fn bincode_decode(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes(chunk.try_into().unwrap()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_input_sensitive() {
        let a = fingerprint("openai", "text-embedding-3-small", 1536, "hello world");
        let b = fingerprint("openai", "text-embedding-3-small", 1536, "hello world");
        let c = fingerprint("openai", "text-embedding-3-small", 1536, "hello there");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn in_process_cache_hits_after_put() {
        let cache = InProcessEmbeddingCache::new(8);
        cache.put("k1", vec![1.0, 2.0]).await;
        assert_eq!(cache.get("k1").await, Some(vec![1.0, 2.0]));
        assert_eq!(cache.get("missing").await, None);
    }

    #[tokio::test]
    async fn in_process_cache_expires_past_ttl() {
        let cache = InProcessEmbeddingCache::new(8).with_ttl(Duration::from_millis(1));
        cache.put("k1", vec![1.0]).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("k1").await, None);
    }

    #[test]
    fn bincode_round_trips_f32_vectors() {
        let v = vec![1.0_f32, -2.5, 3.25];
        assert_eq!(bincode_decode(&bincode_encode(&v)).unwrap(), v);
    }
}
