//! Ingestion orchestrator (C6): drives crawl/upload sources through
//! discovery, crawl, chunk & store, code extraction, and finalize
//! (spec §4.6).

pub mod code_extract;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod request;

pub use error::IngestError;
pub use pipeline::Orchestrator;
pub use progress::{Counters, Phase, Progress, ProgressId, ProgressSnapshot, TerminalStatus};
pub use request::{CrawlRequest, IngestSubject, UploadRequest};
