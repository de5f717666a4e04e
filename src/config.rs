//! TOML configuration.
//!
//! Every tunable of the system is fixed at deploy time in one file
//! (default `./config/medrag.toml`). [`load_config`] parses and validates it;
//! secrets are never stored in the file; they are resolved from the
//! environment by [`GenerationSettings::resolve`] once, at startup of the
//! query-side commands.

use anyhow::{bail, Context, Result};
use medrag_core::chunk::ChunkingParams;
use medrag_core::pipeline::RetrievalParams;
use medrag_core::prompt::SOURCE_LABEL_RESERVE;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    #[serde(default = "default_dataset_path")]
    pub path: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
        }
    }
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("./mtsamples.csv")
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
        }
    }
}

fn default_index_path() -> PathBuf {
    PathBuf::from("./vectorstore")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    2000
}
fn default_overlap_chars() -> usize {
    200
}

impl ChunkingConfig {
    pub fn params(&self) -> Result<ChunkingParams> {
        ChunkingParams::new(self.max_chars, self.overlap_chars)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_max_context_chars() -> usize {
    24_000
}

impl RetrievalConfig {
    pub fn params(&self) -> RetrievalParams {
        RetrievalParams {
            top_k: self.top_k,
            max_context_chars: self.max_context_chars,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout_secs(),
            url: None,
        }
    }
}

fn default_embedding_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_embedding_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: default_generation_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            api_key_env: default_api_key_env(),
            base_url: None,
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

fn default_generation_provider() -> String {
    "gemini".to_string()
}
fn default_generation_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_output_tokens() -> u32 {
    1024
}
fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}
fn default_generation_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}

/// Generation settings with the credential resolved from the environment.
#[derive(Clone)]
pub struct GenerationSettings {
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for GenerationSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationSettings")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl GenerationSettings {
    /// Read the API key named by `api_key_env` and fill in provider defaults.
    ///
    /// # Errors
    ///
    /// Fails if the variable is unset or blank.
    pub fn resolve(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .with_context(|| {
                format!(
                    "{} environment variable not set (required by the {} generation provider)",
                    config.api_key_env, config.provider
                )
            })?;
        Self::with_api_key(config, api_key)
    }

    /// Like [`resolve`](Self::resolve), with the key supplied directly.
    pub fn with_api_key(config: &GenerationConfig, api_key: impl Into<String>) -> Result<Self> {
        let base_url = match (&config.base_url, config.provider.as_str()) {
            (Some(url), _) => url.clone(),
            (None, "gemini") => "https://generativelanguage.googleapis.com".to_string(),
            (None, "openai") => "https://api.openai.com".to_string(),
            (None, other) => bail!("Unknown generation provider: '{}'", other),
        };
        Ok(Self {
            provider: config.provider.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            api_key: api_key.into(),
            base_url,
            timeout_secs: config.timeout_secs,
        })
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    config
        .chunking
        .params()
        .context("invalid [chunking] section")?;

    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }
    let min_context = config.chunking.max_chars.saturating_add(SOURCE_LABEL_RESERVE);
    if config.retrieval.max_context_chars < min_context {
        bail!(
            "retrieval.max_context_chars must be >= {} (chunking.max_chars + {} for the source label)",
            min_context,
            SOURCE_LABEL_RESERVE
        );
    }

    match config.embedding.provider.as_str() {
        "local" | "hash" => {}
        "openai" | "ollama" => {
            if config.embedding.model.is_none() {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
            if config.embedding.dims.unwrap_or(0) == 0 {
                bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => bail!(
            "Unknown embedding provider: '{}'. Must be local, openai, ollama, or hash.",
            other
        ),
    }
    if config.embedding.dims == Some(0) {
        bail!("embedding.dims must be > 0");
    }
    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }

    match config.generation.provider.as_str() {
        "gemini" | "openai" => {}
        other => bail!(
            "Unknown generation provider: '{}'. Must be gemini or openai.",
            other
        ),
    }
    if !(0.0..=2.0).contains(&config.generation.temperature) {
        bail!("generation.temperature must be in [0.0, 2.0]");
    }
    if config.generation.model.trim().is_empty() {
        bail!("generation.model must not be empty");
    }

    Ok(())
}
