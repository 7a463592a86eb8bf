//! Assistant configuration
//!
//! Loaded from a TOML file with `[ollama]`, `[index]`, `[ingest]` and `[pipeline]`
//! sections. Every field has a default, so an empty file (or no file) is valid.
//! A few environment variables override the file:
//!
//! | variable             | field                      |
//! |----------------------|----------------------------|
//! | `OLLAMA_BASE_URL`    | `ollama.base_url`          |
//! | `OLLAMA_MODEL`       | `ollama.model`             |
//! | `OLLAMA_EMBED_MODEL` | `ollama.embedding_model`   |
//! | `SAGE_INDEX_PATH`    | `index.path`               |

use crate::render::RenderFormat;
use crate::stages::DEFAULT_TOP_K;
use anyhow::{Context, Result, bail};
use sage_infer::{HashingConfig, OllamaConfig};
use sage_retriever::{DEFAULT_COLLECTION, IngestConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default location of the index database, relative to the working directory
pub const DEFAULT_INDEX_PATH: &str = ".sage/index.db";

/// How chunk and query embeddings are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// The Ollama embedding endpoint
    #[default]
    Ollama,
    /// Offline feature hashing
    Hashing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub path: PathBuf,
    pub collection: String,
    pub embedder: EmbedderKind,
    /// Used when `embedder = "hashing"`
    pub hashing: HashingConfig,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_INDEX_PATH),
            collection: DEFAULT_COLLECTION.to_string(),
            embedder: EmbedderKind::default(),
            hashing: HashingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Passages retrieved per query
    pub top_k: usize,
    pub format: RenderFormat,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            format: RenderFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub ollama: OllamaConfig,
    pub index: IndexSettings,
    pub ingest: IngestConfig,
    pub pipeline: PipelineSettings,
}

impl AssistantConfig {
    /// Read `path` if given, otherwise start from defaults, then apply the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides, reading variables through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(base_url) = var("OLLAMA_BASE_URL") {
            debug!("OLLAMA_BASE_URL overrides ollama.base_url");
            self.ollama.base_url = base_url;
        }
        if let Some(model) = var("OLLAMA_MODEL") {
            debug!("OLLAMA_MODEL overrides ollama.model");
            self.ollama.model = model;
        }
        if let Some(model) = var("OLLAMA_EMBED_MODEL") {
            debug!("OLLAMA_EMBED_MODEL overrides ollama.embedding_model");
            self.ollama.embedding_model = model;
        }
        if let Some(path) = var("SAGE_INDEX_PATH") {
            debug!("SAGE_INDEX_PATH overrides index.path");
            self.index.path = PathBuf::from(path);
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.ollama.validate()?;
        if self.index.embedder == EmbedderKind::Hashing {
            self.index.hashing.validate()?;
        }
        if self.pipeline.top_k == 0 {
            bail!("pipeline.top_k must be at least 1");
        }
        if self.ingest.concurrency == 0 {
            bail!("ingest.concurrency must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn test_empty_toml_is_default() {
        let config = AssistantConfig::from_toml("").unwrap();
        assert_eq!(config, AssistantConfig::default());
        assert_eq!(config.index.path, PathBuf::from(".sage/index.db"));
        assert_eq!(config.index.collection, "rag_collection");
        assert_eq!(config.pipeline.top_k, 3);
        assert_eq!(config.ingest.chunk_size, 1000);
        assert_eq!(config.ingest.chunk_overlap, 200);
    }

    #[test]
    fn test_sections_parse() {
        let config = AssistantConfig::from_toml(
            r#"
            [ollama]
            base_url = "http://gpu-box:11434"
            model = "mistral"
            timeout = 30

            [index]
            path = "/tmp/sage.db"
            collection = "notes"
            embedder = "hashing"

            [index.hashing]
            dimension = 128

            [ingest]
            chunk_size = 500
            chunk_overlap = 50

            [pipeline]
            top_k = 5
            format = "plain"
            "#,
        )
        .unwrap();

        assert_eq!(config.ollama.base_url, "http://gpu-box:11434");
        assert_eq!(config.ollama.model, "mistral");
        assert_eq!(config.ollama.timeout, Duration::from_secs(30));
        assert_eq!(config.ollama.embedding_model, "nomic-embed-text");
        assert_eq!(config.index.collection, "notes");
        assert_eq!(config.index.embedder, EmbedderKind::Hashing);
        assert_eq!(config.index.hashing.dimension, 128);
        assert_eq!(config.ingest.chunk_size, 500);
        assert_eq!(config.ingest.concurrency, 4);
        assert_eq!(config.pipeline.top_k, 5);
        assert_eq!(config.pipeline.format, RenderFormat::Plain);
        config.validate().unwrap();
    }

    #[test]
    fn test_environment_overrides() {
        let env: HashMap<&str, &str> = [
            ("OLLAMA_BASE_URL", "http://10.0.0.5:11434"),
            ("OLLAMA_MODEL", "llama3.1"),
            ("OLLAMA_EMBED_MODEL", ""),
            ("SAGE_INDEX_PATH", "/data/index.db"),
        ]
        .into_iter()
        .collect();

        let mut config = AssistantConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.ollama.base_url, "http://10.0.0.5:11434");
        assert_eq!(config.ollama.model, "llama3.1");
        assert_eq!(config.ollama.embedding_model, "nomic-embed-text");
        assert_eq!(config.index.path, PathBuf::from("/data/index.db"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = AssistantConfig::from_toml("[pipeline]\ntop_k = 0\n").unwrap();
        assert!(config.validate().is_err());

        assert!(AssistantConfig::from_toml("[pipeline]\nformat = \"html\"\n").is_err());
    }

    #[test]
    fn test_from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");

        let err = AssistantConfig::from_file(&missing).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));

        let path = dir.path().join("sage.toml");
        std::fs::write(&path, "[index]\ncollection = \"work\"\n").unwrap();
        assert_eq!(
            AssistantConfig::from_file(&path).unwrap().index.collection,
            "work"
        );
    }
}
