//! The retrieval-augmented answer pipeline.
//!
//! [`RagPipeline`] owns a loaded [`VectorIndex`], the embedder that built it,
//! and a generator. A query runs strictly in sequence:
//!
//! 1. Embed the question with the index's embedder.
//! 2. Retrieve the top-K chunks by cosine similarity.
//! 3. Assemble a bounded prompt from those chunks.
//! 4. Generate the answer text (one remote call, no retry).
//! 5. Package the text and the chunks used into an [`Answer`].
//!
//! A query either fully succeeds or returns the first error encountered.

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::answer::package_answer;
use crate::embedding::{embed_one, Embedder};
use crate::generate::Generator;
use crate::index::VectorIndex;
use crate::models::{Answer, ScoredChunk};
use crate::prompt::assemble_prompt;

/// Retrieval tuning fixed at deploy time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalParams {
    /// Number of chunks to retrieve per question.
    pub top_k: usize,
    /// Budget for the prompt's context block, in chars.
    pub max_context_chars: usize,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_context_chars: 24_000,
        }
    }
}

/// A query-ready pipeline. Immutable after construction; share it via `Arc`.
pub struct RagPipeline {
    index: VectorIndex,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    params: RetrievalParams,
}

impl RagPipeline {
    /// # Errors
    ///
    /// Fails when the embedder is not the one the index was built with
    /// (different model name or dimensionality), or when `top_k` is zero.
    pub fn new(
        index: VectorIndex,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        params: RetrievalParams,
    ) -> Result<Self> {
        if embedder.model_name() != index.model() || embedder.dims() != index.dims() {
            bail!(
                "embedder {} ({} dims) does not match index built with {} ({} dims)",
                embedder.model_name(),
                embedder.dims(),
                index.model(),
                index.dims()
            );
        }
        if params.top_k == 0 {
            bail!("top_k must be >= 1");
        }
        Ok(Self {
            index,
            embedder,
            generator,
            params,
        })
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn params(&self) -> RetrievalParams {
        self.params
    }

    pub fn generator_model(&self) -> &str {
        self.generator.model_name()
    }

    /// Embed the question and return the nearest chunks, best first.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        let query_vec = embed_one(self.embedder.as_ref(), query).await?;
        Ok(self.index.search(&query_vec, self.params.top_k))
    }

    /// Answer a question from the indexed corpus.
    ///
    /// # Errors
    ///
    /// Fails on a blank question, or when the embedding or generation call
    /// fails; the underlying error is returned unchanged.
    pub async fn answer(&self, query: &str) -> Result<Answer> {
        if query.trim().is_empty() {
            bail!("query must not be empty");
        }

        let retrieved = self.retrieve(query).await?;
        let prompt = assemble_prompt(query, &retrieved, self.params.max_context_chars);
        let generated = self.generator.generate(&prompt.text).await?;

        let mut used = retrieved[..prompt.used].to_vec();
        if let (Some(keep), Some(first)) = (prompt.truncated, used.first_mut()) {
            first.chunk.text = first.chunk.text.chars().take(keep).collect();
        }
        Ok(package_answer(generated, &used))
    }
}
