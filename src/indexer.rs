//! Offline index build.
//!
//! Coordinates the indexing flow: dataset → documents → chunks → embeddings
//! → persisted index. Each build starts from scratch and replaces whatever
//! index already exists at the output path.

use anyhow::Result;
use medrag_core::chunk::{chunk_document, ChunkingParams};
use medrag_core::document::build_documents;
use medrag_core::embedding::{check_vectors, Embedder};
use medrag_core::index::VectorIndex;
use medrag_core::models::{Chunk, Record};
use std::path::PathBuf;

use crate::config::Config;
use crate::dataset;
use crate::embedding::create_embedder;
use crate::index_store::{self, IndexManifest, FORMAT_VERSION};
use crate::progress::{IndexProgressEvent, IndexProgressReporter, ProgressMode};

/// Command-line overrides for one `medrag index` run.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub dataset: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub limit: Option<usize>,
    pub dry_run: bool,
    pub progress: ProgressMode,
}

/// An index built in memory, not yet persisted.
pub struct BuiltIndex {
    pub index: VectorIndex,
    pub documents: usize,
    /// Data rows excluded for having an empty transcription.
    pub skipped: Vec<usize>,
}

/// Split records into chunks, in document then chunk order.
///
/// Returns the chunks, the number of documents they came from, and the rows
/// that produced no document.
pub fn prepare_chunks(
    records: &[Record],
    params: &ChunkingParams,
) -> (Vec<Chunk>, usize, Vec<usize>) {
    let set = build_documents(records);
    for row in &set.skipped {
        tracing::debug!(row, "skipping record with empty transcription");
    }
    let chunks: Vec<Chunk> = set
        .documents
        .iter()
        .flat_map(|doc| chunk_document(doc, params))
        .collect();
    (chunks, set.documents.len(), set.skipped)
}

/// Build an in-memory index from `records`.
///
/// Chunks are embedded `batch_size` at a time; any embedding failure aborts
/// the build.
pub async fn build_index(
    records: &[Record],
    params: &ChunkingParams,
    embedder: &dyn Embedder,
    batch_size: usize,
    progress: &dyn IndexProgressReporter,
) -> Result<BuiltIndex> {
    let (chunks, documents, skipped) = prepare_chunks(records, params);
    let total = chunks.len() as u64;
    let mut index = VectorIndex::new(embedder.model_name(), embedder.dims());

    let mut done = 0u64;
    for batch in chunks.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed(&texts).await?;
        check_vectors(&vectors, texts.len(), embedder.dims())?;
        for (chunk, vector) in batch.iter().cloned().zip(vectors) {
            index.insert(chunk, vector)?;
        }
        done += batch.len() as u64;
        progress.report(IndexProgressEvent::Embedding { n: done, total });
    }

    Ok(BuiltIndex {
        index,
        documents,
        skipped,
    })
}

/// Run `medrag index`.
pub async fn run_index(config: &Config, opts: IndexOptions) -> Result<()> {
    let dataset_path = opts.dataset.unwrap_or_else(|| config.dataset.path.clone());
    let output = opts.output.unwrap_or_else(|| config.index.path.clone());
    let params = config.chunking.params()?;
    let reporter = opts.progress.reporter();

    reporter.report(IndexProgressEvent::Reading {
        path: dataset_path.display().to_string(),
    });
    let mut records = dataset::load_records(&dataset_path)?;
    if let Some(lim) = opts.limit {
        records.truncate(lim);
    }
    tracing::info!(records = records.len(), path = %dataset_path.display(), "dataset loaded");

    if opts.dry_run {
        let (chunks, documents, skipped) = prepare_chunks(&records, &params);
        println!("index {} (dry-run)", output.display());
        println!("  records read: {}", records.len());
        println!("  records skipped (empty transcription): {}", skipped.len());
        println!("  documents: {}", documents);
        println!("  estimated chunks: {}", chunks.len());
        return Ok(());
    }

    let embedder = create_embedder(&config.embedding).await?;
    let built = build_index(
        &records,
        &params,
        embedder.as_ref(),
        config.embedding.batch_size,
        reporter.as_ref(),
    )
    .await?;

    if !built.skipped.is_empty() {
        tracing::info!(
            skipped = built.skipped.len(),
            "records with an empty transcription were not indexed"
        );
    }

    let manifest = IndexManifest {
        format_version: FORMAT_VERSION,
        embedding_model: built.index.model().to_string(),
        embedding_dims: built.index.dims(),
        chunk_max_chars: params.max_chars(),
        chunk_overlap_chars: params.overlap_chars(),
        documents: built.documents,
        chunks: built.index.len(),
        records_skipped: built.skipped.len(),
        built_at: chrono::Utc::now().to_rfc3339(),
    };

    reporter.report(IndexProgressEvent::Writing {
        chunks: built.index.len() as u64,
    });
    index_store::write_index(&output, &built.index, &manifest).await?;

    println!("index {}", output.display());
    println!("  records read: {}", records.len());
    println!(
        "  records skipped (empty transcription): {}",
        manifest.records_skipped
    );
    println!("  documents: {}", manifest.documents);
    println!("  chunks written: {}", manifest.chunks);
    println!(
        "  embedding model: {} ({} dims)",
        manifest.embedding_model, manifest.embedding_dims
    );
    println!("ok");
    Ok(())
}
