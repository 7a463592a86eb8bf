//! Document ingestion into the retrieval index
//!
//! The [`Ingestor`] loads files through the [`LoaderRegistry`], chunks their text with
//! the fixed chunking parameters, tags each chunk with provenance metadata, and submits
//! each file's chunks to the [`VectorIndex`] as one batch.
//!
//! ## Single files
//!
//! [`Ingestor::ingest_file`] fails with a typed [`IngestError`] for missing paths,
//! unsupported extensions, loader failures and index failures. A document without any
//! text yields `Ok(0)` and leaves the index untouched.
//!
//! ## Directories
//!
//! [`Ingestor::ingest_directory`] walks the whole tree (dot-prefixed entries included,
//! VCS ignore files not applied), keeps files with a registered extension, and ingests a bounded
//! number of them concurrently. Per-file failures are logged and counted in
//! [`IngestStats`]; they never abort the rest of the batch.

use crate::error::IngestError;
use crate::storage::{DocumentChunk, VectorIndex};
use chrono::Utc;
use futures::StreamExt;
use sage_context::text::{
    DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, MARKDOWN_DELIMITERS, PROSE_DELIMITERS, TextSplitter,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod loaders;

pub use loaders::{DocumentLoader, LoadedDocument, LoaderRegistry, extension_of};

/// Document type recorded when the caller does not give one.
pub const DEFAULT_DOC_TYPE: &str = "general";

/// Settings for the ingestor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks
    pub chunk_overlap: usize,
    /// Files ingested concurrently during a directory walk
    pub concurrency: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            concurrency: 4,
        }
    }
}

/// Outcome of a directory ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Supported files found
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Chunks written across all successful files
    pub chunks: usize,
}

/// Loads, chunks and indexes documents.
#[derive(Clone)]
pub struct Ingestor {
    index: Arc<dyn VectorIndex>,
    loaders: LoaderRegistry,
    prose_splitter: TextSplitter,
    markdown_splitter: TextSplitter,
    concurrency: usize,
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("index", &self.index.name())
            .field("loaders", &self.loaders)
            .field("chunk_size", &self.prose_splitter.chunk_size())
            .field("overlap", &self.prose_splitter.overlap())
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl Ingestor {
    /// Creates an ingestor with the default loaders.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Config`] when the chunking parameters are invalid, before
    /// any file is touched.
    pub fn new(index: Arc<dyn VectorIndex>, config: IngestConfig) -> Result<Self, IngestError> {
        let prose_splitter = TextSplitter::with_delimiters(
            config.chunk_size,
            config.chunk_overlap,
            PROSE_DELIMITERS,
        )?;
        let markdown_splitter = TextSplitter::with_delimiters(
            config.chunk_size,
            config.chunk_overlap,
            MARKDOWN_DELIMITERS,
        )?;

        Ok(Self {
            index,
            loaders: LoaderRegistry::with_defaults(),
            prose_splitter,
            markdown_splitter,
            concurrency: config.concurrency.max(1),
        })
    }

    /// Replace the loader registry (builder style)
    pub fn with_loaders(self, loaders: LoaderRegistry) -> Self {
        Self { loaders, ..self }
    }

    pub fn loaders(&self) -> &LoaderRegistry {
        &self.loaders
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    fn splitter_for(&self, extension: &str) -> &TextSplitter {
        match extension {
            "md" | "markdown" => &self.markdown_splitter,
            _ => &self.prose_splitter,
        }
    }

    /// Ingest one file, returning the number of chunks written.
    pub async fn ingest_file(
        &self,
        path: &Path,
        doc_type: Option<&str>,
    ) -> Result<usize, IngestError> {
        let is_file = tokio::fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(IngestError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let extension = extension_of(path).unwrap_or_default();
        let loader = self
            .loaders
            .get(&extension)
            .ok_or_else(|| IngestError::UnsupportedType {
                path: path.to_path_buf(),
                extension: format!(".{extension}"),
                supported: self
                    .loaders
                    .supported_extensions()
                    .iter()
                    .map(|ext| format!(".{ext}"))
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;

        tracing::info!("Processing {}", path.display());

        let load_error = |source| IngestError::Load {
            path: path.to_path_buf(),
            source,
        };
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| load_error(e.into()))?;
        let content_hash = hex::encode(blake3::hash(&bytes).as_bytes());
        let documents = loader.parse(bytes).await.map_err(load_error)?;

        let text = documents
            .iter()
            .map(|doc| doc.text.as_str())
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        if text.trim().is_empty() {
            tracing::info!("No text found in {}, nothing to index", path.display());
            return Ok(0);
        }

        let source = path.display().to_string();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.clone());
        let doc_type = doc_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_DOC_TYPE)
            .to_string();
        let ingested_at = Utc::now();

        let chunks: Vec<DocumentChunk> = self
            .splitter_for(&extension)
            .get_chunks(&text)
            .into_iter()
            .map(|chunk| DocumentChunk {
                text: chunk.chunk_text,
                source: source.clone(),
                filename: filename.clone(),
                doc_type: doc_type.clone(),
                ingested_at,
                chunk_index: chunk.sequence,
                content_hash: content_hash.clone(),
            })
            .collect();
        tracing::debug!("Split {} into {} chunks", path.display(), chunks.len());

        let written = self
            .index
            .add(&chunks)
            .await
            .map_err(|source| IngestError::Index {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::info!(
            "Successfully processed {} ({} chunks created)",
            filename,
            written
        );
        Ok(written)
    }

    /// Ingest every supported file under `path`.
    pub async fn ingest_directory(
        &self,
        path: &Path,
        doc_type: Option<&str>,
    ) -> Result<IngestStats, IngestError> {
        let is_dir = tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(IngestError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let files = self.collect_files(path);
        tracing::info!(
            "Found {} supported files under {}",
            files.len(),
            path.display()
        );

        let stats = futures::stream::iter(files)
            .map(|file| async move {
                let result = self.ingest_file(&file, doc_type).await;
                (file, result)
            })
            .buffer_unordered(self.concurrency)
            .fold(IngestStats::default(), |mut stats, (file, result)| async move {
                stats.total += 1;
                match result {
                    Ok(chunks) => {
                        stats.succeeded += 1;
                        stats.chunks += chunks;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to ingest {}: {}", file.display(), e);
                        stats.failed += 1;
                    }
                }
                stats
            })
            .await;

        tracing::info!(
            "Directory ingestion complete: {} total, {} succeeded, {} failed",
            stats.total,
            stats.succeeded,
            stats.failed
        );
        Ok(stats)
    }

    fn collect_files(&self, root: &Path) -> Vec<PathBuf> {
        let walker = ignore::WalkBuilder::new(root)
            .hidden(false)
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false)
            .build();

        let mut files: Vec<PathBuf> = walker
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
            .map(|entry| entry.into_path())
            .filter(|path| self.loaders.is_supported(path))
            .collect();

        files.sort();
        files
    }
}
