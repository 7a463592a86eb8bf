//! Offline embedder based on feature hashing
//!
//! Produces deterministic bag-of-words vectors without a model server, so an index can be
//! built and queried on machines where Ollama is not running, and so tests are
//! reproducible. Tokens are hashed with FNV into `dimension` buckets, counts are scaled
//! sublinearly (`ln(1 + tf)`), and the result is L2-normalized. Vectors are persisted,
//! so the token hash must be stable across builds (FNV, not the std hasher).

use crate::config::HashingConfig;
use crate::error::Result;
use crate::provider::{EmbeddingProvider, EmbeddingResult, normalize_to_f16};
use async_trait::async_trait;
use fnv::FnvHasher;
use std::hash::Hasher;

/// Deterministic embedder that needs no external service
#[derive(Debug, Clone, Default)]
pub struct HashingEmbedder {
    config: HashingConfig,
}

impl HashingEmbedder {
    /// Creates an embedder after validating the configuration.
    pub fn new(config: HashingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Number of components in each vector
    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn tokens<'a>(&self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        let lowercase = self.config.lowercase;
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|token| token.chars().count() > 2)
            .map(move |token| {
                if lowercase {
                    token.to_lowercase()
                } else {
                    token.to_string()
                }
            })
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut counts = vec![0.0f32; self.config.dimension];

        for token in self.tokens(text) {
            let mut hasher = FnvHasher::default();
            hasher.write(token.as_bytes());
            let bucket = (hasher.finish() % self.config.dimension as u64) as usize;
            counts[bucket] += 1.0;
        }

        for value in counts.iter_mut().filter(|v| **v > 0.0) {
            *value = (1.0 + *value).ln();
        }
        counts
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        let raw: Vec<Vec<f32>> = texts.iter().map(|text| self.embed_one(text)).collect();
        Ok(EmbeddingResult::new(normalize_to_f16(raw)))
    }

    fn provider_name(&self) -> &str {
        "hashing"
    }
}
