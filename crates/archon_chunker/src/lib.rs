//! Chunker (C4): splits normalized text into ordered, size-bounded,
//! boundary-preserving chunks.

pub mod config;
pub mod llms_txt;
pub mod splitter;

pub use config::ChunkerConfig;
pub use llms_txt::{split_sections, Section};
pub use splitter::{chunk_text, content_hash, Chunk};
