//! Text generation trait.
//!
//! Remote model clients implement [`Generator`] and convert whatever their
//! wire response looks like into a [`GeneratedText`] at the boundary, so the
//! pipeline never inspects provider-specific response shapes.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Text produced by a generation model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedText {
    pub text: String,
}

impl GeneratedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A text-generation backend.
///
/// One call is one outbound request. Implementations do not retry; any
/// failure is returned to the caller as-is.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-2.0-flash"`).
    fn model_name(&self) -> &str;
    /// Generate a completion for a fully assembled prompt.
    async fn generate(&self, prompt: &str) -> Result<GeneratedText>;
}
