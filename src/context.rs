//! Query-side process context.
//!
//! [`QueryContext::initialize`] runs once when a query command or the
//! server starts. It resolves the generation credential, builds the
//! embedder and generator, and tries to load the persisted index. A missing
//! index is not fatal here: the context records it and every query reports
//! [`IndexError::NotFound`] until the process is restarted after
//! `medrag index`. Any other failure (bad credentials, embedding mismatch,
//! corrupt index) aborts startup.

use anyhow::Result;
use medrag_core::embedding::Embedder;
use medrag_core::generate::Generator;
use medrag_core::pipeline::{RagPipeline, RetrievalParams};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Config, GenerationSettings};
use crate::embedding::create_embedder;
use crate::generation::create_generator;
use crate::index_store::{self, IndexError};

/// Shared, read-only state for answering questions.
pub struct QueryContext {
    index_path: PathBuf,
    pipeline: Option<Arc<RagPipeline>>,
}

impl QueryContext {
    /// Build the context from configuration.
    pub async fn initialize(config: &Config) -> Result<Self> {
        let settings = GenerationSettings::resolve(&config.generation)?;
        tracing::debug!(?settings, "generation settings resolved");
        let embedder = create_embedder(&config.embedding).await?;
        let generator = create_generator(&settings)?;
        Self::open(
            &config.index.path,
            embedder,
            generator,
            config.retrieval.params(),
        )
        .await
    }

    /// Build the context from already constructed components.
    pub async fn open(
        index_path: &Path,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        params: RetrievalParams,
    ) -> Result<Self> {
        let index = match index_store::load_index(index_path, embedder.as_ref()).await {
            Ok(index) => index,
            Err(err)
                if matches!(
                    err.downcast_ref::<IndexError>(),
                    Some(IndexError::NotFound { .. })
                ) =>
            {
                tracing::warn!(path = %index_path.display(), "index not found; queries will fail until it is built");
                return Ok(Self {
                    index_path: index_path.to_path_buf(),
                    pipeline: None,
                });
            }
            Err(err) => return Err(err),
        };

        let pipeline = RagPipeline::new(index, embedder, generator, params)?;
        Ok(Self {
            index_path: index_path.to_path_buf(),
            pipeline: Some(Arc::new(pipeline)),
        })
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn is_ready(&self) -> bool {
        self.pipeline.is_some()
    }

    /// The ready pipeline, or [`IndexError::NotFound`].
    pub fn pipeline(&self) -> Result<Arc<RagPipeline>, IndexError> {
        self.pipeline.clone().ok_or_else(|| IndexError::NotFound {
            path: self.index_path.clone(),
        })
    }
}
