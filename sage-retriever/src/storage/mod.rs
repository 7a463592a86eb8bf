//! Storage abstraction for the retrieval index
//!
//! The pipeline and the ingestor only see the [`VectorIndex`] trait: chunks go in with
//! their metadata, ranked passages come out for a query string. Embedding happens inside
//! the index so callers never handle vectors.
//!
//! ## Key Components
//!
//! - **VectorIndex**: `add`, `search`, `count`, `name`
//! - **DocumentChunk**: A stored unit of text with provenance metadata
//! - **RetrievedPassage**: A ranked search hit
//! - **SqliteIndex**: The SQLite implementation in [`sqlite_store`]

use crate::error::IndexError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub mod sqlite_store;

pub use sqlite_store::SqliteIndex;

/// Collection name used when none is configured.
pub const DEFAULT_COLLECTION: &str = "rag_collection";

/// A chunk of a source document, ready to be indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentChunk {
    /// Chunk text, never empty
    pub text: String,
    /// Path of the source file as given to the ingestor
    pub source: String,
    /// File name component of `source`
    pub filename: String,
    /// Caller-supplied document category, `"general"` by default
    pub doc_type: String,
    pub ingested_at: DateTime<Utc>,
    /// Position of the chunk within its document, from 0
    pub chunk_index: usize,
    /// blake3 hex digest of the source file bytes
    pub content_hash: String,
}

/// A passage returned by [`VectorIndex::search`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedPassage {
    pub text: String,
    /// Cosine similarity to the query
    pub score: f32,
    /// 0 is the most relevant passage
    pub rank: usize,
    pub source: String,
}

/// Nearest-neighbour text store shared by ingestion and retrieval.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embed and store a batch of chunks atomically, returning how many were written
    async fn add(&self, chunks: &[DocumentChunk]) -> Result<usize, IndexError>;

    /// Return at most `k` passages ordered by decreasing similarity to `query`
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>, IndexError>;

    /// Number of chunks stored
    async fn count(&self) -> Result<usize, IndexError>;

    /// Name of the collection this index serves
    fn name(&self) -> &str;
}
