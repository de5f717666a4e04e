//! On-disk persistence of the vector index.
//!
//! An index is a directory holding a single SQLite file, `index.sqlite`,
//! with two tables: `manifest` (key/value build facts) and `chunks` (one row
//! per chunk, vector stored as a little-endian f32 BLOB). A build writes
//! `index.sqlite.tmp` next to it and renames it into place once complete, so
//! a reader sees either the previous index or the new one, never a partial
//! file. Rebuilding always overwrites; nothing is merged.

use anyhow::{Context, Result};
use medrag_core::embedding::{blob_to_vec, vec_to_blob, Embedder};
use medrag_core::index::VectorIndex;
use medrag_core::models::{Chunk, ChunkMetadata};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::db;
use crate::migrate;

pub const INDEX_FILE: &str = "index.sqlite";
const TMP_FILE: &str = "index.sqlite.tmp";
pub const FORMAT_VERSION: u32 = 1;

/// Failures a caller may want to handle rather than just report.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index not found at {}", path.display())]
    NotFound { path: PathBuf },

    #[error(
        "index at {} was built with {index_model} ({index_dims} dims) but the configured embedder is {model} ({dims} dims); rebuild the index",
        path.display()
    )]
    EmbeddingMismatch {
        path: PathBuf,
        index_model: String,
        index_dims: usize,
        model: String,
        dims: usize,
    },

    #[error("index at {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
}

/// Facts recorded about a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexManifest {
    pub format_version: u32,
    pub embedding_model: String,
    pub embedding_dims: usize,
    pub chunk_max_chars: usize,
    pub chunk_overlap_chars: usize,
    pub documents: usize,
    pub chunks: usize,
    pub records_skipped: usize,
    /// RFC 3339 timestamp.
    pub built_at: String,
}

impl IndexManifest {
    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("format_version", self.format_version.to_string()),
            ("embedding_model", self.embedding_model.clone()),
            ("embedding_dims", self.embedding_dims.to_string()),
            ("chunk_max_chars", self.chunk_max_chars.to_string()),
            ("chunk_overlap_chars", self.chunk_overlap_chars.to_string()),
            ("documents", self.documents.to_string()),
            ("chunks", self.chunks.to_string()),
            ("records_skipped", self.records_skipped.to_string()),
            ("built_at", self.built_at.clone()),
        ]
    }

    fn from_map(path: &Path, map: &HashMap<String, String>) -> Result<Self, IndexError> {
        let text = |key: &str| -> Result<String, IndexError> {
            map.get(key).cloned().ok_or_else(|| IndexError::Corrupt {
                path: path.to_path_buf(),
                reason: format!("manifest is missing '{}'", key),
            })
        };
        let number = |key: &str| -> Result<usize, IndexError> {
            text(key)?.parse().map_err(|_| IndexError::Corrupt {
                path: path.to_path_buf(),
                reason: format!("manifest value '{}' is not a number", key),
            })
        };

        let format_version =
            u32::try_from(number("format_version")?).map_err(|_| IndexError::Corrupt {
                path: path.to_path_buf(),
                reason: "manifest value 'format_version' is out of range".to_string(),
            })?;
        if format_version != FORMAT_VERSION {
            return Err(IndexError::Corrupt {
                path: path.to_path_buf(),
                reason: format!(
                    "unsupported format version {} (expected {}); rebuild the index",
                    format_version, FORMAT_VERSION
                ),
            });
        }

        Ok(Self {
            format_version,
            embedding_model: text("embedding_model")?,
            embedding_dims: number("embedding_dims")?,
            chunk_max_chars: number("chunk_max_chars")?,
            chunk_overlap_chars: number("chunk_overlap_chars")?,
            documents: number("documents")?,
            chunks: number("chunks")?,
            records_skipped: number("records_skipped")?,
            built_at: text("built_at")?,
        })
    }
}

/// Persist `index` and its manifest under `dir`, replacing any previous index.
pub async fn write_index(dir: &Path, index: &VectorIndex, manifest: &IndexManifest) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create index directory: {}", dir.display()))?;

    let tmp_path = dir.join(TMP_FILE);
    if tmp_path.exists() {
        std::fs::remove_file(&tmp_path)?;
    }

    let pool = db::connect_for_write(&tmp_path).await?;
    migrate::create_schema(&pool).await?;

    let mut tx = pool.begin().await?;
    for (key, value) in manifest.to_pairs() {
        sqlx::query("INSERT INTO manifest (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
    }
    for (position, entry) in index.entries().iter().enumerate() {
        let chunk = &entry.chunk;
        sqlx::query(
            r#"
            INSERT INTO chunks (position, source, specialty, description, document_index,
                                chunk_index, start_char, text, hash, vector)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(position as i64)
        .bind(&chunk.metadata.source)
        .bind(&chunk.metadata.specialty)
        .bind(&chunk.metadata.description)
        .bind(chunk.document_index as i64)
        .bind(chunk.chunk_index as i64)
        .bind(chunk.start as i64)
        .bind(&chunk.text)
        .bind(&chunk.hash)
        .bind(vec_to_blob(&entry.vector))
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    pool.close().await;

    let final_path = dir.join(INDEX_FILE);
    std::fs::rename(&tmp_path, &final_path).with_context(|| {
        format!(
            "Failed to move {} into place at {}",
            tmp_path.display(),
            final_path.display()
        )
    })?;

    tracing::debug!(path = %final_path.display(), chunks = index.len(), "index written");
    Ok(())
}

async fn open(dir: &Path) -> Result<SqlitePool> {
    let path = dir.join(INDEX_FILE);
    if !path.is_file() {
        return Err(IndexError::NotFound {
            path: dir.to_path_buf(),
        }
        .into());
    }
    db::connect_read_only(&path)
        .await
        .with_context(|| format!("Failed to open index: {}", path.display()))
}

async fn fetch_manifest(dir: &Path, pool: &SqlitePool) -> Result<IndexManifest> {
    let rows = sqlx::query("SELECT key, value FROM manifest")
        .fetch_all(pool)
        .await
        .map_err(|e| IndexError::Corrupt {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

    let map: HashMap<String, String> = rows
        .iter()
        .map(|r| (r.get::<String, _>("key"), r.get::<String, _>("value")))
        .collect();
    Ok(IndexManifest::from_map(dir, &map)?)
}

/// Read only the manifest of the index under `dir`.
pub async fn read_manifest(dir: &Path) -> Result<IndexManifest> {
    let pool = open(dir).await?;
    let manifest = fetch_manifest(dir, &pool).await;
    pool.close().await;
    manifest
}

/// Load the index under `dir` for querying with `embedder`.
///
/// # Errors
///
/// [`IndexError::NotFound`] if nothing has been built there,
/// [`IndexError::EmbeddingMismatch`] if it was built with a different
/// embedding model or dimensionality.
pub async fn load_index(dir: &Path, embedder: &dyn Embedder) -> Result<VectorIndex> {
    let pool = open(dir).await?;
    let manifest = fetch_manifest(dir, &pool).await?;

    if manifest.embedding_model != embedder.model_name() || manifest.embedding_dims != embedder.dims()
    {
        pool.close().await;
        return Err(IndexError::EmbeddingMismatch {
            path: dir.to_path_buf(),
            index_model: manifest.embedding_model,
            index_dims: manifest.embedding_dims,
            model: embedder.model_name().to_string(),
            dims: embedder.dims(),
        }
        .into());
    }

    let rows = sqlx::query(
        r#"
        SELECT source, specialty, description, document_index, chunk_index,
               start_char, text, hash, vector
        FROM chunks
        ORDER BY position ASC
        "#,
    )
    .fetch_all(&pool)
    .await?;
    pool.close().await;

    let mut index = VectorIndex::new(manifest.embedding_model, manifest.embedding_dims);
    for row in &rows {
        let blob: Vec<u8> = row.get("vector");
        let chunk = Chunk {
            document_index: row.get::<i64, _>("document_index") as usize,
            chunk_index: row.get::<i64, _>("chunk_index") as usize,
            start: row.get::<i64, _>("start_char") as usize,
            text: row.get("text"),
            hash: row.get("hash"),
            metadata: ChunkMetadata {
                source: row.get("source"),
                specialty: row.get("specialty"),
                description: row.get("description"),
            },
        };
        index
            .insert(chunk, blob_to_vec(&blob))
            .map_err(|e| IndexError::Corrupt {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })?;
    }

    tracing::info!(
        path = %dir.display(),
        chunks = index.len(),
        model = %index.model(),
        "index loaded"
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use medrag_core::chunk::content_hash;
    use medrag_core::embedding::HashEmbedder;

    fn chunk(doc: usize, text: &str) -> Chunk {
        Chunk {
            document_index: doc,
            chunk_index: 0,
            start: 0,
            text: text.to_string(),
            hash: content_hash(text),
            metadata: ChunkMetadata {
                source: format!("Sample {}", doc),
                specialty: "Neurology".to_string(),
                description: "Headache".to_string(),
            },
        }
    }

    fn manifest(index: &VectorIndex) -> IndexManifest {
        IndexManifest {
            format_version: FORMAT_VERSION,
            embedding_model: index.model().to_string(),
            embedding_dims: index.dims(),
            chunk_max_chars: 2000,
            chunk_overlap_chars: 200,
            documents: index.len(),
            chunks: index.len(),
            records_skipped: 1,
            built_at: "2024-01-01T00:00:00+00:00".to_string(),
        }
    }

    fn build(embedder: &HashEmbedder, texts: &[&str]) -> VectorIndex {
        let mut index = VectorIndex::new(HashEmbedder::MODEL_NAME, embedder.dims());
        for (i, t) in texts.iter().enumerate() {
            index.insert(chunk(i, t), embedder.embed_text(t)).unwrap();
        }
        index
    }

    #[tokio::test]
    async fn test_write_then_load_preserves_order_and_vectors() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = HashEmbedder::new(32).unwrap();
        let index = build(&embedder, &["migraine with aura", "knee arthroscopy", "chest pain"]);
        write_index(dir.path(), &index, &manifest(&index)).await.unwrap();

        assert!(dir.path().join(INDEX_FILE).is_file());
        assert!(!dir.path().join(TMP_FILE).exists());

        let loaded = load_index(dir.path(), &embedder).await.unwrap();
        assert_eq!(loaded.len(), 3);
        for (a, b) in loaded.entries().iter().zip(index.entries()) {
            assert_eq!(a.chunk, b.chunk);
            assert_eq!(a.vector, b.vector);
        }

        let m = read_manifest(dir.path()).await.unwrap();
        assert_eq!(m, manifest(&index));
    }

    #[tokio::test]
    async fn test_missing_index_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = HashEmbedder::new(32).unwrap();
        let err = load_index(&dir.path().join("nope"), &embedder)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_dims_mismatch_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let built_with = HashEmbedder::new(32).unwrap();
        let index = build(&built_with, &["otitis media"]);
        write_index(dir.path(), &index, &manifest(&index)).await.unwrap();

        let other = HashEmbedder::new(64).unwrap();
        let err = load_index(dir.path(), &other).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::EmbeddingMismatch { index_dims: 32, dims: 64, .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_format_version_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = HashEmbedder::new(32).unwrap();
        let index = build(&embedder, &["gout flare"]);
        let mut future = manifest(&index);
        future.format_version = FORMAT_VERSION + 1;
        write_index(dir.path(), &index, &future).await.unwrap();

        let err = load_index(dir.path(), &embedder).await.unwrap_err();
        match err.downcast_ref::<IndexError>() {
            Some(IndexError::Corrupt { reason, .. }) => {
                assert!(reason.contains("unsupported format version 2"))
            }
            other => panic!("expected Corrupt, got {:?}", other),
        }
        assert!(read_manifest(dir.path()).await.is_err());
    }

    #[test]
    fn test_oversized_format_version_is_corrupt() {
        let mut map: HashMap<String, String> = manifest(&VectorIndex::new("m", 4))
            .to_pairs()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        map.insert("format_version".to_string(), "4294967297".to_string());
        let err = IndexManifest::from_map(Path::new("idx"), &map).unwrap_err();
        assert!(matches!(err, IndexError::Corrupt { ref reason, .. } if reason.contains("out of range")));
    }

    #[tokio::test]
    async fn test_rebuild_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = HashEmbedder::new(32).unwrap();
        let first = build(&embedder, &["one", "two", "three"]);
        write_index(dir.path(), &first, &manifest(&first)).await.unwrap();
        let second = build(&embedder, &["only"]);
        write_index(dir.path(), &second, &manifest(&second)).await.unwrap();

        let loaded = load_index(dir.path(), &embedder).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.entries()[0].chunk.text, "only");
    }
}
