//! Tabular dataset loading.
//!
//! Reads the medical transcription CSV into [`Record`]s. The file must have
//! a header row containing at least `transcription`, `medical_specialty`,
//! and `description`; `sample_name` is optional. Extra columns (such as an
//! unnamed leading row index) are ignored. Header names are trimmed; field
//! values are kept as written.
//!
//! Rows with an empty transcription are kept here; excluding them is the
//! document builder's job, so the indexer can count what it dropped.

use anyhow::{bail, Context, Result};
use medrag_core::models::Record;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

const REQUIRED_COLUMNS: [&str; 3] = ["transcription", "medical_specialty", "description"];

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(default)]
    transcription: Option<String>,
    #[serde(default)]
    medical_specialty: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    sample_name: Option<String>,
}

/// Load every row of the dataset at `path`.
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open dataset: {}", path.display()))?;
    read_records(file).with_context(|| format!("Failed to read dataset: {}", path.display()))
}

/// Parse records from any CSV source.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<Record>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        bail!("dataset is missing required column(s): {}", missing.join(", "));
    }

    let mut records = Vec::new();
    for (row, result) in rdr.deserialize::<Row>().enumerate() {
        let raw = result.with_context(|| format!("malformed row {}", row + 1))?;
        records.push(Record {
            row,
            transcription: raw.transcription.unwrap_or_default(),
            specialty: raw.medical_specialty.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            sample_name: raw.sample_name,
        });
    }
    Ok(records)
}
