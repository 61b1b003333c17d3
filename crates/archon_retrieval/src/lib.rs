//! Hybrid vector/lexical retrieval engine (C7): a single `search()` entry
//! point over the storage adapter's two indexed read paths.

pub mod error;
pub mod fusion;
pub mod result;
pub mod search;

pub use error::RetrievalError;
pub use result::{MatchType, SearchEnvelope, SearchResult};
pub use search::RetrievalEngine;
