//! Error types for the index, the loaders and the ingestor

use sage_context::ChunkError;
use sage_infer::InferError;
use std::path::PathBuf;

/// Errors raised by a [`VectorIndex`](crate::storage::VectorIndex).
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The underlying database failed
    #[error("Database error: {source}")]
    Database {
        #[from]
        source: sqlx::Error,
    },

    /// Embedding the chunks or the query failed
    #[error("Embedding failed: {source}")]
    Embedding {
        #[from]
        source: InferError,
    },

    /// Vectors in the index were produced by a different embedder
    #[error("Embedding dimension mismatch: index holds {expected}, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// A stored row could not be decoded
    #[error("Corrupt index entry: {message}")]
    Corrupt { message: String },

    /// IO errors when preparing the database location
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl IndexError {
    pub fn corrupt<S: Into<String>>(message: S) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }
}

/// Errors raised while turning a file into text.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("File is not valid UTF-8: {source}")]
    Encoding {
        #[from]
        source: std::string::FromUtf8Error,
    },

    #[error("PDF text extraction failed: {message}")]
    Pdf { message: String },

    #[error("Loader task failed: {source}")]
    Task {
        #[from]
        source: tokio::task::JoinError,
    },
}

/// Errors raised by the [`Ingestor`](crate::ingest::Ingestor).
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The path does not exist or is the wrong kind of entry
    #[error("Path not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// No loader is registered for the file extension
    #[error("Unsupported file type {extension:?} for {}; supported: {supported}", path.display())]
    UnsupportedType {
        path: PathBuf,
        extension: String,
        supported: String,
    },

    /// The loader could not extract text
    #[error("Failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: LoadError,
    },

    /// The index rejected the chunks
    #[error("Failed to index {}: {source}", path.display())]
    Index {
        path: PathBuf,
        #[source]
        source: IndexError,
    },

    /// Chunking parameters are invalid
    #[error(transparent)]
    Config(#[from] ChunkError),
}
