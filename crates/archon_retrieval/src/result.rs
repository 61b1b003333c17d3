//! Result shapes returned by the retrieval engine (spec §4.7).

use archon_protocol::{PageId, SourceId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Vector,
    Text,
    Hybrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub page_id: PageId,
    pub source_id: SourceId,
    pub url: String,
    pub chunk_number: i32,
    pub content: String,
    pub score: f64,
    pub match_type: MatchType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEnvelope {
    pub results: Vec<SearchResult>,
    /// Set when a backend failure forced a narrower search path than the
    /// one requested (spec §4.7 failure semantics).
    pub degraded: bool,
}
