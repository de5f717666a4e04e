//! Sliding-window text chunker.
//!
//! Splits document text into [`Chunk`]s of at most `max_chars` characters,
//! each overlapping the previous one by exactly `overlap_chars`, so context
//! that straddles a boundary survives in at least one chunk.
//!
//! Lengths and offsets are counted in Unicode scalar values, never bytes, so
//! a boundary can never land inside a multi-byte character.
//!
//! # Algorithm
//!
//! 1. `stride = max_chars − overlap_chars` (always ≥ 1, see [`ChunkingParams::new`]).
//! 2. Chunk *i* starts at char offset `i × stride` and spans up to `max_chars` chars.
//! 3. Stop after the first chunk that reaches the end of the text; only that
//!    final chunk may be shorter than `max_chars`.
//! 4. Empty text yields no chunks.
//!
//! # Example
//!
//! ```rust
//! use medrag_core::chunk::{split_text, ChunkingParams};
//!
//! let params = ChunkingParams::new(8, 2).unwrap();
//! let windows = split_text("AAAA BBBB CCCC", &params);
//! assert_eq!(windows.len(), 2);
//! assert_eq!(windows[0].text, "AAAA BBB");
//! assert_eq!(windows[1].start, 6);
//! assert_eq!(windows[1].text, "BBB CCCC");
//! ```

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};

use crate::models::{Chunk, Document};

/// Validated window configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingParams {
    max_chars: usize,
    overlap_chars: usize,
}

impl ChunkingParams {
    /// # Errors
    ///
    /// Fails unless `0 < max_chars` and `overlap_chars < max_chars`; any
    /// other combination would stall the window.
    pub fn new(max_chars: usize, overlap_chars: usize) -> Result<Self> {
        if max_chars == 0 {
            bail!("chunk max length must be > 0");
        }
        if overlap_chars >= max_chars {
            bail!(
                "chunk overlap ({}) must be smaller than chunk max length ({})",
                overlap_chars,
                max_chars
            );
        }
        Ok(Self {
            max_chars,
            overlap_chars,
        })
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn overlap_chars(&self) -> usize {
        self.overlap_chars
    }

    /// Distance in chars between consecutive chunk starts.
    pub fn stride(&self) -> usize {
        self.max_chars - self.overlap_chars
    }
}

/// One window over a text, before document metadata is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextWindow<'a> {
    /// Char offset of the window's first character.
    pub start: usize,
    pub text: &'a str,
}

/// Split `text` into overlapping windows.
pub fn split_text<'a>(text: &'a str, params: &ChunkingParams) -> Vec<TextWindow<'a>> {
    // Byte offset of every char boundary, including the end of the text.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = bounds.len() - 1;

    let mut windows = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + params.max_chars).min(total);
        windows.push(TextWindow {
            start,
            text: &text[bounds[start]..bounds[end]],
        });
        if end == total {
            break;
        }
        start += params.stride();
    }
    windows
}

/// Split a document into chunks that inherit its metadata.
pub fn chunk_document(doc: &Document, params: &ChunkingParams) -> Vec<Chunk> {
    split_text(&doc.text, params)
        .into_iter()
        .enumerate()
        .map(|(i, w)| Chunk {
            document_index: doc.index,
            chunk_index: i,
            start: w.start,
            text: w.text.to_string(),
            hash: content_hash(w.text),
            metadata: doc.metadata.clone(),
        })
        .collect()
}

/// Rebuild the original text from one document's chunks by dropping each
/// chunk's leading overlap.
pub fn reassemble(chunks: &[Chunk], overlap_chars: usize) -> String {
    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            out.push_str(&chunk.text);
        } else {
            out.extend(chunk.text.chars().skip(overlap_chars));
        }
    }
    out
}

/// Hex SHA-256 of a chunk's text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
