//! Configuration for model providers

use crate::error::{InferError, Result};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
/// Default completion model.
pub const DEFAULT_COMPLETION_MODEL: &str = "llama3";
/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
/// Sampling temperature used for every stage prompt.
pub const DEFAULT_TEMPERATURE: f32 = 0.75;

/// Configuration for an Ollama server
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
#[serde(default)]
pub struct OllamaConfig {
    /// Base URL of the server, without a trailing path
    #[builder(default = "DEFAULT_OLLAMA_BASE_URL.to_string()")]
    pub base_url: String,
    /// Model used for text completion
    #[builder(default = "DEFAULT_COMPLETION_MODEL.to_string()")]
    pub model: String,
    /// Model used for embeddings
    #[builder(default = "DEFAULT_EMBEDDING_MODEL.to_string()")]
    pub embedding_model: String,
    /// Sampling temperature passed in `options.temperature`
    #[builder(default = "DEFAULT_TEMPERATURE")]
    pub temperature: f32,
    /// Per-attempt deadline
    #[builder(default = "Duration::from_secs(120)")]
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Additional attempts after a transient failure
    #[builder(default = "2")]
    pub max_retries: u32,
    /// Base delay between attempts; attempt `n` waits `n * retry_backoff`
    #[builder(default = "Duration::from_millis(500)")]
    #[serde(with = "duration_millis")]
    pub retry_backoff: Duration,
}

impl OllamaConfig {
    /// Create a new configuration using the builder
    pub fn builder() -> OllamaConfigBuilder {
        OllamaConfigBuilder::default()
    }

    /// Create a configuration for a server and completion model, other fields default
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    /// Set the per-attempt timeout (builder style)
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Set retry count and backoff (builder style)
    pub fn with_retries(self, max_retries: u32, retry_backoff: Duration) -> Self {
        Self {
            max_retries,
            retry_backoff,
            ..self
        }
    }

    /// Full URL for an API path such as `api/generate`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(InferError::invalid_config(format!(
                "base URL must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }
        if self.model.trim().is_empty() {
            return Err(InferError::invalid_config("completion model name is empty"));
        }
        if self.embedding_model.trim().is_empty() {
            return Err(InferError::invalid_config("embedding model name is empty"));
        }
        if self.timeout.is_zero() {
            return Err(InferError::invalid_config("timeout must be positive"));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(InferError::invalid_config(format!(
                "temperature must be a non-negative number, got {}",
                self.temperature
            )));
        }

        tracing::debug!("Ollama configuration valid for model: {}", self.model);
        Ok(())
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            model: DEFAULT_COMPLETION_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(120),
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

/// Configuration for the offline hashing embedder
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
#[serde(default)]
pub struct HashingConfig {
    /// Number of buckets in each vector
    #[builder(default = "384")]
    pub dimension: usize,
    /// Lower-case tokens before hashing
    #[builder(default = "true")]
    pub lowercase: bool,
}

impl HashingConfig {
    /// Create a new configuration using the builder
    pub fn builder() -> HashingConfigBuilder {
        HashingConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(InferError::invalid_config(
                "embedding dimension must be positive",
            ));
        }
        Ok(())
    }
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            lowercase: true,
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
