//! Record → document synthesis.
//!
//! Each surviving record becomes exactly one [`Document`] whose text is a
//! short header (specialty and description) followed by the transcription.
//! Records with a missing or whitespace-only transcription are excluded.

use crate::models::{ChunkMetadata, Document, Record, UNKNOWN_SOURCE};

/// Build the document for a record, or `None` when its transcription is blank.
pub fn build_document(index: usize, record: &Record) -> Option<Document> {
    if record.transcription.trim().is_empty() {
        return None;
    }

    let text = format!(
        "[Specialty: {}] [Description: {}] {}",
        record.specialty, record.description, record.transcription
    );

    Some(Document {
        index,
        text,
        metadata: ChunkMetadata {
            source: source_id(record),
            specialty: record.specialty.clone(),
            description: record.description.clone(),
        },
    })
}

/// Documents built from a batch of records, plus the excluded records.
#[derive(Debug, Default)]
pub struct DocumentSet {
    pub documents: Vec<Document>,
    /// Rows dropped for having no transcription.
    pub skipped: Vec<usize>,
}

/// Build documents for all records, numbering survivors contiguously.
pub fn build_documents(records: &[Record]) -> DocumentSet {
    let mut set = DocumentSet::default();
    for record in records {
        match build_document(set.documents.len(), record) {
            Some(doc) => set.documents.push(doc),
            None => set.skipped.push(record.row),
        }
    }
    set
}

fn source_id(record: &Record) -> String {
    record
        .sample_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_SOURCE)
        .to_string()
}
