//! TOML-based configuration for the RAG pipeline
//!
//! Every section and field is optional; missing values fall back to the
//! defaults below. A loaded configuration is validated before it is returned.
//!
//! ```toml
//! [chunking]
//! chunk_size = 1000
//!
//! [retrieval]
//! top_k = 3
//! batch_size = 64
//! max_concurrent_batches = 4
//!
//! [prompt]
//! chars_per_token = 4.0
//! truncation_marker = "..."
//! max_tokens = 1000
//!
//! [provider]
//! timeout_secs = 30
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::llm::CallBudget;
use crate::rag::embeddings::DEFAULT_CHUNK_SIZE;
use crate::prompt::helpers::{TokenBudget, DEFAULT_CHARS_PER_TOKEN, DEFAULT_TRUNCATION_MARKER};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub prompt: PromptConfig,

    #[serde(default)]
    pub provider: ProviderConfig,
}

/// Document chunking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

/// Corpus embedding and search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of chunks placed in the prompt context
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Chunks per embedding call; 0 sends the whole corpus in one call
    #[serde(default)]
    pub batch_size: usize,

    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,
}

fn default_top_k() -> usize {
    1
}

fn default_max_concurrent_batches() -> usize {
    4
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            batch_size: 0,
            max_concurrent_batches: default_max_concurrent_batches(),
        }
    }
}

/// Prompt rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: f64,

    #[serde(default = "default_truncation_marker")]
    pub truncation_marker: String,

    /// Global token budget exposed to templates as `.MaxTokens`
    #[serde(default)]
    pub max_tokens: Option<f64>,
}

fn default_chars_per_token() -> f64 {
    DEFAULT_CHARS_PER_TOKEN
}

fn default_truncation_marker() -> String {
    DEFAULT_TRUNCATION_MARKER.to_string()
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            chars_per_token: default_chars_per_token(),
            truncation_marker: default_truncation_marker(),
            max_tokens: None,
        }
    }
}

/// Provider call limits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Per-call timeout; unbounded when absent
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl RagConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RagConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunking.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "chunking.chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be greater than zero".to_string(),
            ));
        }
        if self.retrieval.max_concurrent_batches == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.max_concurrent_batches must be greater than zero".to_string(),
            ));
        }
        let cpt = self.prompt.chars_per_token;
        if !(cpt.is_finite() && cpt > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "prompt.chars_per_token must be a positive number, got {}",
                cpt
            )));
        }
        if let Some(max_tokens) = self.prompt.max_tokens {
            if !(max_tokens.is_finite() && max_tokens >= 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "prompt.max_tokens must be a non-negative number, got {}",
                    max_tokens
                )));
            }
        }
        if self.provider.timeout_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "provider.timeout_secs must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn token_budget(&self) -> TokenBudget {
        TokenBudget {
            chars_per_token: self.prompt.chars_per_token,
            truncation_marker: self.prompt.truncation_marker.clone(),
        }
    }

    /// Call budget carrying the configured timeout and no cancellation.
    pub fn call_budget(&self) -> CallBudget {
        match self.provider.timeout_secs {
            Some(secs) => CallBudget::new().with_timeout(Duration::from_secs(secs)),
            None => CallBudget::new(),
        }
    }
}
