//! In-memory vector index.
//!
//! Holds every chunk alongside its embedding and answers top-K queries by
//! brute-force cosine similarity. The index is filled once (at build time
//! or when loaded from disk) and is read-only afterwards, so a shared
//! reference can serve concurrent queries without locking.
//!
//! Ordering is deterministic: results are sorted by descending score with a
//! stable sort, so equal scores keep insertion order.

use anyhow::{bail, Result};

use crate::embedding::cosine_similarity;
use crate::models::{Chunk, ScoredChunk};

/// One indexed chunk and its vector.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// Flat cosine-similarity index over chunk embeddings.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    model: String,
    dims: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Create an empty index for vectors produced by `model` with `dims` components.
    pub fn new(model: impl Into<String>, dims: usize) -> Self {
        Self {
            model: model.into(),
            dims,
            entries: Vec::new(),
        }
    }

    /// Embedding model the stored vectors came from.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Append a chunk and its vector.
    ///
    /// # Errors
    ///
    /// Fails if the vector's length differs from the index dimensionality.
    pub fn insert(&mut self, chunk: Chunk, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dims {
            bail!(
                "vector for chunk {}:{} has {} dims, index expects {}",
                chunk.document_index,
                chunk.chunk_index,
                vector.len(),
                self.dims
            );
        }
        self.entries.push(IndexEntry { chunk, vector });
        Ok(())
    }

    /// Return the `k` chunks most similar to `query_vec`, best first.
    ///
    /// The result length is `min(k, self.len())`.
    pub fn search(&self, query_vec: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(query_vec, &e.vector)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        scored
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect()
    }
}
