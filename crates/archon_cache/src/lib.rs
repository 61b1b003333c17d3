//! Content-addressed embedding cache (C2) and the in-process TTL cache
//! reused by the retrieval engine's result cache and the project
//! reporting service's report cache.

pub mod embedding;
pub mod ttl;

pub use embedding::{fingerprint, EmbeddingCache, InProcessEmbeddingCache, RedisEmbeddingCache};
pub use ttl::TtlCache;
