//! Index overview for `medrag stats`.
//!
//! Reads only the manifest, so it works without an API key and without
//! loading any vectors.

use anyhow::Result;
use std::path::Path;

use crate::index_store::{self, IndexManifest, INDEX_FILE};

/// Run the stats command: read the manifest and print a summary.
pub async fn run_stats(index_dir: &Path) -> Result<()> {
    let manifest = index_store::read_manifest(index_dir).await?;
    let size = std::fs::metadata(index_dir.join(INDEX_FILE))
        .map(|m| m.len())
        .unwrap_or(0);
    print!("{}", render(index_dir, size, &manifest));
    Ok(())
}

fn render(index_dir: &Path, size: u64, m: &IndexManifest) -> String {
    let built = chrono::DateTime::parse_from_rfc3339(&m.built_at)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC%:z").to_string())
        .unwrap_or_else(|_| m.built_at.clone());

    let mut out = String::new();
    out.push_str("medrag index stats\n");
    out.push_str("==================\n\n");
    out.push_str(&format!("  Index:       {}\n", index_dir.display()));
    out.push_str(&format!("  Size:        {}\n", format_bytes(size)));
    out.push_str(&format!("  Built:       {}\n", built));
    out.push_str(&format!("  Format:      v{}\n\n", m.format_version));
    out.push_str(&format!(
        "  Embedding:   {} ({} dims)\n",
        m.embedding_model, m.embedding_dims
    ));
    out.push_str(&format!(
        "  Chunking:    {} chars, {} overlap\n\n",
        m.chunk_max_chars, m.chunk_overlap_chars
    ));
    out.push_str(&format!("  Documents:   {}\n", m.documents));
    out.push_str(&format!("  Chunks:      {}\n", m.chunks));
    out.push_str(&format!("  Skipped:     {} (empty transcription)\n", m.records_skipped));
    out
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
