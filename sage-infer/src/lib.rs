//! # sage-infer
//!
//! Model providers for the sage knowledge assistant: text completion for the pipeline
//! stages and text embeddings for the retrieval index. Callers depend on the
//! [`CompletionProvider`] and [`EmbeddingProvider`] traits and receive concrete clients
//! by injection, so tests can substitute deterministic stubs.
//!
//! ## Providers
//!
//! - [`OllamaProvider`]: Both traits over an Ollama server's HTTP API, with a per-call
//!   timeout and retry of transient failures.
//! - [`HashingEmbedder`]: Offline feature-hashing embeddings, no server required.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sage_infer::{CompletionProvider, OllamaConfig, OllamaProvider};
//!
//! # async fn example() -> sage_infer::Result<()> {
//! let provider = OllamaProvider::new(OllamaConfig::new("http://localhost:11434", "llama3"))?;
//! let answer = provider.complete("Name the capital of France.").await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Embeddings
//!
//! Embeddings are returned as unit-length half-precision (f16) vectors, which halves
//! storage in the index while keeping cosine similarity a plain dot product.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`] using the crate's [`InferError`] type. Only
//! [`InferError::Unavailable`] is retried, and only inside the provider.

pub mod config;
pub mod error;
pub mod hashing;
pub mod ollama;
pub mod provider;

// Re-export main types for easy access
pub use config::{HashingConfig, OllamaConfig, OllamaConfigBuilder};
pub use error::{InferError, Result};
pub use hashing::HashingEmbedder;
pub use ollama::OllamaProvider;
pub use provider::{CompletionProvider, EmbeddingProvider, EmbeddingResult};
