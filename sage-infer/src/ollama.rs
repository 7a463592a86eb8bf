//! Ollama HTTP client implementing completion and embedding
//!
//! Talks to the two non-streaming endpoints of an Ollama server:
//!
//! - `POST /api/generate` with `{model, prompt, stream: false, options: {temperature}}`,
//!   answered by `{response}`.
//! - `POST /api/embed` with `{model, input: [..]}`, answered by `{embeddings: [[..]]}`.
//!
//! Every attempt runs under the configured timeout. Connection failures and HTTP 5xx/429
//! answers are retried up to `max_retries` times, waiting `attempt * retry_backoff`
//! between attempts. Timeouts and malformed answers are returned immediately.

use crate::config::OllamaConfig;
use crate::error::{InferError, Result};
use crate::provider::{CompletionProvider, EmbeddingProvider, EmbeddingResult, normalize_to_f16};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Provider backed by an Ollama server
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    config: OllamaConfig,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Creates a provider after validating the configuration.
    pub fn new(config: OllamaConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| InferError::invalid_config(format!("failed to build HTTP client: {e}")))?;

        tracing::info!(
            "Ollama provider ready at {} (model: {}, embeddings: {})",
            config.base_url,
            config.model,
            config.embedding_model
        );
        Ok(Self { config, client })
    }

    /// The configuration this provider was built with
    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = self.config.endpoint(path);
        let mut attempt: u32 = 1;

        loop {
            match self.post_once(&url, body).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt <= self.config.max_retries => {
                    tracing::warn!("Ollama request to {} failed (attempt {}): {}", url, attempt, e);
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn post_once<Req, Resp>(&self, url: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let after = self.config.timeout;
        let request = async {
            let response = self
                .client
                .post(url)
                .json(body)
                .send()
                .await
                .map_err(|e| self.classify(url, e))?;

            let status = response.status();
            if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                return Err(InferError::unavailable_status(format!(
                    "{url} answered HTTP {status}"
                )));
            }
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(InferError::invalid_response(format!(
                    "{url} answered HTTP {status}: {text}"
                )));
            }

            response
                .json::<Resp>()
                .await
                .map_err(|e| self.classify(url, e))
        };

        tokio::time::timeout(after, request)
            .await
            .unwrap_or(Err(InferError::Timeout { after }))
    }

    fn classify(&self, url: &str, error: reqwest::Error) -> InferError {
        if error.is_timeout() {
            InferError::Timeout {
                after: self.config.timeout,
            }
        } else if error.is_decode() {
            InferError::invalid_response(format!("unexpected body from {url}: {error}"))
        } else {
            InferError::unavailable(format!("request to {url} failed"), error)
        }
    }
}

#[async_trait]
impl CompletionProvider for OllamaProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        tracing::debug!(
            "Requesting completion from {} ({} prompt chars)",
            self.config.model,
            prompt.chars().count()
        );

        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
            },
        };
        let response: GenerateResponse = self.post_json("api/generate", &request).await?;

        tracing::debug!(
            "Completion received ({} chars)",
            response.response.chars().count()
        );
        Ok(response.response)
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        tracing::debug!(
            "Generating embeddings for {} texts with {}",
            texts.len(),
            self.config.embedding_model
        );

        let request = EmbedRequest {
            model: &self.config.embedding_model,
            input: texts,
        };
        let response: EmbedResponse = self.post_json("api/embed", &request).await?;

        if response.embeddings.len() != texts.len() {
            return Err(InferError::invalid_response(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }
        let dimension = response.embeddings[0].len();
        if dimension == 0 || response.embeddings.iter().any(|e| e.len() != dimension) {
            return Err(InferError::invalid_response(
                "embeddings have inconsistent or zero dimension",
            ));
        }

        Ok(EmbeddingResult::new(normalize_to_f16(response.embeddings)))
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_generate_request_wire_format() {
        let request = GenerateRequest {
            model: "llama3",
            prompt: "hello",
            stream: false,
            options: GenerateOptions { temperature: 0.75 },
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "llama3");
        assert_eq!(json["prompt"], "hello");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["temperature"], 0.75);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = OllamaConfig::default().with_timeout(Duration::ZERO);
        assert!(matches!(
            OllamaProvider::new(config),
            Err(InferError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_provider_name() {
        let provider = OllamaProvider::new(OllamaConfig::default()).unwrap();
        assert_eq!(CompletionProvider::provider_name(&provider), "ollama");
        assert_eq!(EmbeddingProvider::provider_name(&provider), "ollama");
    }
}
