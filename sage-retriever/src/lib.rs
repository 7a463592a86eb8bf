//! sage-retriever: Document store behind the knowledge assistant
//!
//! This crate owns everything between a file on disk and a ranked passage handed to the
//! first pipeline stage: loading documents, chunking them, embedding and storing the
//! chunks, and similarity search.
//!
//! ## Key Modules
//!
//! - **[`storage`]**: The [`VectorIndex`] trait and its SQLite implementation
//! - **[`ingest`]**: Loader registry and the [`Ingestor`] for files and directories
//! - **[`error`]**: Typed errors for indexing, loading and ingestion
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sage_infer::HashingEmbedder;
//! use sage_retriever::{IngestConfig, Ingestor, SqliteIndex, VectorIndex};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let index = Arc::new(
//!     SqliteIndex::open(Path::new(".sage/index.db"), "rag_collection", Arc::new(HashingEmbedder::default())).await?,
//! );
//! let ingestor = Ingestor::new(index.clone(), IngestConfig::default())?;
//!
//! let stats = ingestor.ingest_directory(Path::new("notes"), None).await?;
//! println!("{} of {} files indexed", stats.succeeded, stats.total);
//!
//! for passage in index.search("capital of France", 3).await? {
//!     println!("{:.3} {}", passage.score, passage.source);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Files → LoaderRegistry → TextSplitter → DocumentChunk → VectorIndex (SQLite)
//!                                                              ↓
//!                                        query → embed → cosine rank → RetrievedPassage
//! ```

pub mod error;
pub mod ingest;
pub mod storage;

pub use error::{IndexError, IngestError, LoadError};
pub use ingest::{IngestConfig, IngestStats, Ingestor, LoaderRegistry};
pub use storage::{DEFAULT_COLLECTION, DocumentChunk, RetrievedPassage, SqliteIndex, VectorIndex};
