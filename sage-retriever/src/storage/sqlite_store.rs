//! SQLite implementation of [`VectorIndex`]
//!
//! Chunks and their embeddings live in a single table. Ranking loads the embeddings of
//! one collection and scores them in memory with cosine similarity, which is adequate
//! for a personal document store of a few hundred thousand chunks.
//!
//! ## Database Schema
//!
//! ```sql
//! CREATE TABLE chunks (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     collection TEXT NOT NULL,       -- logical collection name
//!     content_hash TEXT NOT NULL,     -- blake3 hex of the source file
//!     chunk_index INTEGER NOT NULL,   -- position within the document
//!     source TEXT NOT NULL,
//!     filename TEXT NOT NULL,
//!     doc_type TEXT NOT NULL,
//!     ingested_at TIMESTAMP NOT NULL,
//!     content TEXT NOT NULL,
//!     embedding BLOB NOT NULL,        -- f16 vector, native byte order
//!     UNIQUE(collection, source, content_hash, chunk_index)
//! );
//! ```
//!
//! Re-ingesting an unchanged file hits the unique key and updates the rows in place.
//! Identical files at different paths are distinct documents and keep their own rows.
//!
//! ## SQLite Settings
//!
//! - **WAL mode**: Searches proceed while an ingestion batch is being written
//! - **Busy timeout**: Concurrent writers wait instead of failing
//! - **One transaction per batch**: Readers see all of a file's chunks or none

use super::{DEFAULT_COLLECTION, DocumentChunk, RetrievedPassage, VectorIndex};
use crate::error::IndexError;
use async_trait::async_trait;
use half::f16;
use sage_infer::EmbeddingProvider;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::sync::Arc;

/// SQLite-backed vector index.
pub struct SqliteIndex {
    pool: SqlitePool,
    collection: String,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for SqliteIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteIndex")
            .field("collection", &self.collection)
            .field("embedder", &self.embedder.provider_name())
            .finish()
    }
}

impl SqliteIndex {
    /// Opens (creating if needed) the database file at `path`.
    pub async fn open(
        path: &Path,
        collection: impl Into<String>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, IndexError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(path)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .create_if_missing(true),
        )
        .await?;

        tracing::info!("Opened index database at {}", path.display());
        Self::new_with_pool(pool, collection.into(), embedder).await
    }

    /// Opens an in-memory index, mainly for tests.
    ///
    /// The pool is pinned to a single connection that never expires, since every
    /// in-memory SQLite connection is a separate database.
    pub async fn open_memory(
        collection: impl Into<String>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, IndexError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::new_with_pool(pool, collection.into(), embedder).await
    }

    async fn new_with_pool(
        pool: SqlitePool,
        collection: String,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, IndexError> {
        Self::create_tables(&pool).await?;

        let collection = if collection.trim().is_empty() {
            DEFAULT_COLLECTION.to_string()
        } else {
            collection
        };

        Ok(Self {
            pool,
            collection,
            embedder,
        })
    }

    async fn create_tables(pool: &SqlitePool) -> Result<(), IndexError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                source TEXT NOT NULL,
                filename TEXT NOT NULL,
                doc_type TEXT NOT NULL,
                ingested_at TIMESTAMP NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                CONSTRAINT unique_chunk UNIQUE(collection, source, content_hash, chunk_index)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_collection ON chunks(collection)")
            .execute(pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source)")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// The connection pool, for diagnostics
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Dimension of the vectors already stored in this collection, if any
    async fn stored_dimension(&self) -> Result<Option<usize>, IndexError> {
        let bytes: Option<i64> = sqlx::query_scalar(
            "SELECT length(embedding) FROM chunks WHERE collection = ?1 LIMIT 1",
        )
        .bind(&self.collection)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bytes.map(|b| b as usize / std::mem::size_of::<f16>()))
    }
}

fn decode_embedding(bytes: &[u8]) -> Result<Vec<f16>, IndexError> {
    if bytes.len() % std::mem::size_of::<f16>() != 0 {
        return Err(IndexError::corrupt(format!(
            "embedding blob of {} bytes is not a whole number of f16 values",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| f16::from_ne_bytes([pair[0], pair[1]]))
        .collect())
}

// Cosine similarity; mismatched or zero vectors score 0
fn cosine_similarity(a: &[f16], b: &[f16]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot_product = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        let x = x.to_f32();
        let y = y.to_f32();
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let norm_a = norm_a.sqrt();
    let norm_b = norm_b.sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn add(&self, chunks: &[DocumentChunk]) -> Result<usize, IndexError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_texts(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(IndexError::Embedding {
                source: sage_infer::InferError::invalid_response(format!(
                    "expected {} embeddings, got {}",
                    chunks.len(),
                    embeddings.len()
                )),
            });
        }

        if let Some(expected) = self.stored_dimension().await? {
            if expected != embeddings.dimension {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    found: embeddings.dimension,
                });
            }
        }

        let mut tx = self.pool.begin().await?;

        for (chunk, embedding) in chunks.iter().zip(&embeddings.embeddings) {
            let embedding_bytes = bytemuck::cast_slice::<f16, u8>(embedding);

            sqlx::query(
                r#"
                INSERT INTO chunks (collection, content_hash, chunk_index, source, filename,
                                    doc_type, ingested_at, content, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(collection, source, content_hash, chunk_index) DO UPDATE SET
                    filename = excluded.filename,
                    doc_type = excluded.doc_type,
                    ingested_at = excluded.ingested_at,
                    content = excluded.content,
                    embedding = excluded.embedding
                "#,
            )
            .bind(&self.collection)
            .bind(&chunk.content_hash)
            .bind(chunk.chunk_index as i64)
            .bind(&chunk.source)
            .bind(&chunk.filename)
            .bind(&chunk.doc_type)
            .bind(chunk.ingested_at)
            .bind(&chunk.text)
            .bind(embedding_bytes)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(
            "Stored {} chunks in collection {}",
            chunks.len(),
            self.collection
        );
        Ok(chunks.len())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>, IndexError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed_text(query).await?;

        let rows = sqlx::query(
            "SELECT content, source, embedding FROM chunks WHERE collection = ?1 ORDER BY id",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in rows {
            let embedding_bytes: Vec<u8> = row.try_get("embedding")?;
            let embedding = decode_embedding(&embedding_bytes)?;
            if embedding.len() != query_embedding.len() {
                return Err(IndexError::DimensionMismatch {
                    expected: embedding.len(),
                    found: query_embedding.len(),
                });
            }

            let score = cosine_similarity(&query_embedding, &embedding);
            let text: String = row.try_get("content")?;
            let source: String = row.try_get("source")?;
            scored.push((score, text, source));
        }

        // Sort by similarity score (descending); stable so ties keep insertion order
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        let passages: Vec<RetrievedPassage> = scored
            .into_iter()
            .enumerate()
            .map(|(rank, (score, text, source))| RetrievedPassage {
                text,
                score,
                rank,
                source,
            })
            .collect();

        tracing::debug!(
            "Search in {} returned {} passages",
            self.collection,
            passages.len()
        );
        Ok(passages)
    }

    async fn count(&self) -> Result<usize, IndexError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE collection = ?1")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    fn name(&self) -> &str {
        &self.collection
    }
}
