//! Size-bounded, boundary-preserving text segmentation (spec §4.4).
//!
//! Boundary preference order: sentence > paragraph > whitespace > hard
//! character cut. A chunk is only as large as `max_chunk_size`; overlap
//! is carried from the tail of the previous chunk so chunk boundaries
//! don't sever context needed by embeddings.

use sha2::{Digest, Sha256};

use crate::config::ChunkerConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub chunk_number: i32,
    pub content: String,
    pub start_position: usize,
    pub end_position: usize,
    pub content_hash: String,
    pub token_count: usize,
}

/// Splits `text` into ordered chunks, each `<= config.max_chunk_size`
/// characters, with `config.overlap` characters of repeated context
/// carried from the end of the previous chunk into the start of the
/// next.
pub fn chunk_text(text: &str, config: &ChunkerConfig) -> Vec<Chunk> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut start = 0usize;
    let mut chunk_number = 0i32;

    while start < len {
        let ideal_end = (start + config.max_chunk_size).min(len);
        let end = if ideal_end >= len {
            len
        } else {
            find_boundary(text, start, ideal_end)
        };

        let content = text[start..end].to_string();
        chunks.push(Chunk {
            chunk_number,
            content: content.clone(),
            start_position: start,
            end_position: end,
            content_hash: content_hash(&content),
            token_count: approx_token_count(&content),
        });
        chunk_number += 1;

        if end >= len {
            break;
        }
        // Carry `overlap` characters of the previous chunk forward, but
        // never re-walk backwards past `start` (that would loop forever
        // on a chunk shorter than the overlap window).
        let next_start = end.saturating_sub(config.overlap);
        start = if next_start > start { next_start } else { end };
    }

    chunks
}

/// Finds the best split point in `text[start..]` at or before
/// `ideal_end`: sentence boundary, else paragraph boundary, else
/// whitespace, else a hard cut at `ideal_end`.
fn find_boundary(text: &str, start: usize, ideal_end: usize) -> usize {
    let window = &text[start..ideal_end];

    if let Some(pos) = last_sentence_boundary(window) {
        if pos > 0 {
            return start + pos;
        }
    }
    if let Some(pos) = window.rfind("\n\n") {
        if pos > 0 {
            return start + pos + 2;
        }
    }
    if let Some(pos) = window.rfind(char::is_whitespace) {
        if pos > 0 {
            return start + pos + 1;
        }
    }
    // Last resort: hard character cut, snapped to a char boundary so we
    // never split inside a multi-byte UTF-8 sequence.
    let mut cut = ideal_end;
    while cut > start && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    if cut == start {
        ideal_end
    } else {
        cut
    }
}

fn last_sentence_boundary(window: &str) -> Option<usize> {
    let mut best = None;
    for (i, c) in window.char_indices() {
        if matches!(c, '.' | '!' | '?') {
            let next = window[i + c.len_utf8()..].chars().next();
            if next.is_none() || next.map(|n| n.is_whitespace()).unwrap_or(false) {
                best = Some(i + c.len_utf8());
            }
        }
    }
    best
}

pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// BPE token count compatible with the active embedding model family.
/// `tiktoken-rs`'s `cl100k_base` is the encoding shared by the
/// `text-embedding-3-*` model family, the default embedding provider
/// target; a non-OpenAI-family model would undercount slightly, which
/// is acceptable since this is advisory metadata, not a billing figure.
fn approx_token_count(content: &str) -> usize {
    use tiktoken_rs::cl100k_base;
    thread_local! {
        static BPE: tiktoken_rs::CoreBPE = cl100k_base().expect("cl100k_base tokenizer tables are bundled");
    }
    BPE.with(|bpe| bpe.encode_with_special_tokens(content).len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", &ChunkerConfig::crawl()).is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk_text("hello world", &ChunkerConfig::crawl());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_number, 0);
        assert_eq!(chunks[0].content, "hello world");
    }

    #[test]
    fn chunks_are_contiguous_and_ordered() {
        let text = "a".repeat(2000);
        let chunks = chunk_text(&text, &ChunkerConfig::new(600, 200));
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_number, i as i32);
        }
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.content.len() <= 600));
    }

    #[test]
    fn prefers_sentence_boundary_over_hard_cut() {
        let text = format!("{} End. {}", "word ".repeat(100), "more ".repeat(100));
        let chunks = chunk_text(&text, &ChunkerConfig::new(520, 50));
        assert!(chunks[0].content.trim_end().ends_with("End."));
    }

    #[test]
    fn content_hash_is_deterministic() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
    }

    #[test]
    fn never_splits_inside_a_multibyte_char() {
        let text = "héllo wörld ".repeat(100);
        let chunks = chunk_text(&text, &ChunkerConfig::new(37, 10));
        for c in &chunks {
            assert!(text.is_char_boundary(c.start_position));
            assert!(text.is_char_boundary(c.end_position));
        }
    }
}
