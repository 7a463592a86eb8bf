//! End-to-end tests: files on disk → Ingestor → SQLite index → search
//!
//! These tests use the offline hashing embedder so they run without a model server:
//! - Ingesting a directory with valid, corrupt and unsupported files
//! - Searching the ingested chunks
//! - Re-ingesting unchanged files without duplicating chunks
//! - Overlap between stored chunks of a long document
//! - Identical files at different paths
//! - Searching an on-disk index while a directory is being ingested

use anyhow::Result;
use sage_infer::{EmbeddingProvider, HashingEmbedder};
use sage_retriever::{
    IngestConfig, IngestError, IngestStats, Ingestor, SqliteIndex, VectorIndex,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::tempdir;

async fn memory_setup() -> Result<(Arc<SqliteIndex>, Ingestor)> {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::default());
    let index = Arc::new(SqliteIndex::open_memory("rag_collection", embedder).await?);
    let ingestor = Ingestor::new(index.clone(), IngestConfig::default())?;
    Ok((index, ingestor))
}

#[tokio::test]
async fn test_directory_with_corrupt_file() -> Result<()> {
    let dir = tempdir()?;
    std::fs::write(
        dir.path().join("france.txt"),
        "Paris is the capital of France.",
    )?;
    std::fs::write(
        dir.path().join("rust.md"),
        "# Rust\n\nRust is a systems programming language.",
    )?;
    std::fs::write(dir.path().join("corrupt.txt"), [0xff, 0xfe, 0x00, 0xc3])?;
    std::fs::write(dir.path().join("data.json"), "{}")?;

    let (index, ingestor) = memory_setup().await?;
    let stats = ingestor.ingest_directory(dir.path(), None).await?;

    assert_eq!(
        stats,
        IngestStats {
            total: 3,
            succeeded: 2,
            failed: 1,
            chunks: 2,
        }
    );
    assert_eq!(index.count().await?, 2);

    let passages = index.search("What is the capital of France?", 3).await?;
    assert_eq!(passages.len(), 2);
    assert_eq!(passages[0].text, "Paris is the capital of France.");
    assert!(passages[0].source.ends_with("france.txt"));
    Ok(())
}

#[tokio::test]
async fn test_reingesting_unchanged_file_is_idempotent() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "Overlapping windows keep sentences intact. ".repeat(80))?;

    let (index, ingestor) = memory_setup().await?;
    let first = ingestor.ingest_file(&path, None).await?;
    let second = ingestor.ingest_file(&path, None).await?;

    assert_eq!(first, second);
    assert_eq!(index.count().await?, first);
    Ok(())
}

#[tokio::test]
async fn test_changed_file_adds_new_chunks() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("log.txt");
    let (index, ingestor) = memory_setup().await?;

    std::fs::write(&path, "Version one of the document.")?;
    ingestor.ingest_file(&path, None).await?;
    std::fs::write(&path, "Version two of the document.")?;
    ingestor.ingest_file(&path, None).await?;

    // Append-only: the earlier version stays searchable
    assert_eq!(index.count().await?, 2);
    Ok(())
}

#[tokio::test]
async fn test_identical_files_are_both_indexed() -> Result<()> {
    let dir = tempdir()?;
    let body = "Quarterly planning notes: hire two engineers.";
    std::fs::create_dir(dir.path().join("2024"))?;
    std::fs::create_dir(dir.path().join("backup"))?;
    std::fs::write(dir.path().join("2024").join("plan.txt"), body)?;
    std::fs::write(dir.path().join("backup").join("plan.txt"), body)?;

    let (index, ingestor) = memory_setup().await?;
    let stats = ingestor.ingest_directory(dir.path(), None).await?;
    assert_eq!((stats.succeeded, stats.chunks), (2, 2));
    assert_eq!(index.count().await?, 2);

    let passages = index.search("planning notes", 5).await?;
    assert_eq!(passages.len(), 2);
    assert_ne!(passages[0].source, passages[1].source);
    assert!(passages.iter().all(|p| p.text == body));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_search_during_directory_ingestion() -> Result<()> {
    let dir = tempdir()?;
    let docs = dir.path().join("docs");
    std::fs::create_dir(&docs)?;
    for i in 0..24 {
        std::fs::write(
            docs.join(format!("note_{i:02}.txt")),
            format!("Note {i} records the status of project number {i}."),
        )?;
    }

    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::default());
    let index = Arc::new(SqliteIndex::open(&dir.path().join("index.db"), "notes", embedder).await?);
    let ingestor = Ingestor::new(index.clone(), IngestConfig::default())?;
    let ingesting = AtomicBool::new(true);

    let ingest = async {
        let stats = ingestor.ingest_directory(&docs, None).await;
        ingesting.store(false, Ordering::SeqCst);
        stats
    };
    let search = async {
        let mut rounds = 0usize;
        let mut last_count = 0;
        while ingesting.load(Ordering::SeqCst) || rounds == 0 {
            let passages = index.search("project status", 3).await?;
            assert!(passages.len() <= 3);
            let count = index.count().await?;
            assert!(count >= last_count, "count went from {last_count} to {count}");
            last_count = count;
            rounds += 1;
            tokio::task::yield_now().await;
        }
        anyhow::Ok(rounds)
    };

    let (stats, rounds) = tokio::join!(ingest, search);
    let stats = stats?;
    assert!(rounds? > 0);

    assert_eq!((stats.total, stats.succeeded, stats.failed), (24, 24, 0));
    assert_eq!(index.count().await?, 24);
    assert_eq!(index.search("project status", 3).await?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_long_document_chunks_overlap() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("long.txt");
    let text: String = (0..200)
        .map(|i| format!("Line {i} describes part of the ingestion pipeline.\n"))
        .collect();
    std::fs::write(&path, &text)?;

    let (index, ingestor) = memory_setup().await?;
    let written = ingestor.ingest_file(&path, Some("manual")).await?;

    assert!(written > 1);
    assert_eq!(index.count().await?, written);

    let rows: Vec<(i64, String)> = sqlx::query_as(
        "SELECT chunk_index, content FROM chunks WHERE doc_type = 'manual' ORDER BY chunk_index",
    )
    .fetch_all(index.pool())
    .await?;
    assert_eq!(rows.len(), written);

    for pair in rows.windows(2) {
        let tail: Vec<char> = pair[0].1.chars().collect();
        let tail: String = tail[tail.len() - 200..].iter().collect();
        assert!(pair[1].1.starts_with(&tail), "chunks {} and {} do not overlap", pair[0].0, pair[1].0);
    }
    Ok(())
}

#[tokio::test]
async fn test_missing_and_unsupported_paths() -> Result<()> {
    let dir = tempdir()?;
    let (_index, ingestor) = memory_setup().await?;

    assert!(matches!(
        ingestor.ingest_directory(&dir.path().join("absent"), None).await,
        Err(IngestError::NotFound { .. })
    ));

    let sheet = dir.path().join("sheet.xlsx");
    std::fs::write(&sheet, b"PK")?;
    assert!(matches!(
        ingestor.ingest_file(&sheet, None).await,
        Err(IngestError::UnsupportedType { .. })
    ));

    let stats = ingestor.ingest_directory(dir.path(), None).await?;
    assert_eq!(stats, IngestStats::default());
    Ok(())
}

#[tokio::test]
async fn test_stats_serialize() -> Result<()> {
    let stats = IngestStats {
        total: 3,
        succeeded: 2,
        failed: 1,
        chunks: 7,
    };
    let json = serde_json::to_value(stats)?;
    assert_eq!(json["total"], 3);
    assert_eq!(json["succeeded"], 2);
    assert_eq!(json["failed"], 1);
    Ok(())
}
