//! Chunker configuration: size bounds and overlap window (spec §4.4).
//!
//! Both defaults are exposed as configuration per spec §9's open
//! question rather than hard-coded; `crawl()` and `upload()` pick the
//! defaults measured against the teacher's own ingestion sizes (see
//! DESIGN.md).

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkerConfig {
    pub max_chunk_size: usize,
    pub overlap: usize,
}

impl ChunkerConfig {
    /// Default for crawl ingestion (spec §4.4: 600 chars, 200 overlap).
    pub fn crawl() -> Self {
        Self {
            max_chunk_size: 600,
            overlap: 200,
        }
    }

    /// Default for project-document uploads (spec §4.4: 1500 chars, 200 overlap).
    pub fn upload() -> Self {
        Self {
            max_chunk_size: 1500,
            overlap: 200,
        }
    }

    pub fn new(max_chunk_size: usize, overlap: usize) -> Self {
        Self {
            max_chunk_size,
            overlap,
        }
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self::crawl()
    }
}
