//! Core data models used throughout medrag.
//!
//! These types represent the records, documents, chunks, and answers that
//! flow through the indexing and query pipeline.

use serde::{Deserialize, Serialize};

/// Source identifier used when a record carries no sample name.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// One row of the source dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Zero-based data row number in the source file (header excluded).
    pub row: usize,
    pub transcription: String,
    pub specialty: String,
    pub description: String,
    pub sample_name: Option<String>,
}

/// Metadata carried from a document onto each of its chunks.
///
/// Serializes as a flat JSON object: `{"source": .., "specialty": .., "description": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Identifier of the originating record (its sample name).
    pub source: String,
    pub specialty: String,
    pub description: String,
}

/// A synthesized document: header + transcription, one per surviving record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Position of the document in the indexing run.
    pub index: usize,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A contiguous window of a document's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Index of the parent [`Document`] in the indexing run.
    pub document_index: usize,
    /// Position of this chunk within its document (`0, 1, 2, …`).
    pub chunk_index: usize,
    /// Offset of the first character, counted in chars from the document start.
    pub start: usize,
    pub text: String,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
    pub metadata: ChunkMetadata,
}

/// A retrieved chunk with its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine similarity to the query, in `[-1.0, 1.0]`.
    pub score: f32,
}

/// A chunk as returned to callers in an [`Answer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// The response contract for one question.
///
/// ```json
/// { "result": "...", "source_documents": [{"text": "...", "metadata": {"source": "..."}}], "sources": ["..."] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Generated answer text.
    pub result: String,
    /// Chunks placed in the prompt, in retrieval order.
    pub source_documents: Vec<SourceDocument>,
    /// `source_documents[i].metadata.source`, in the same order.
    pub sources: Vec<String>,
}
