//! The assistant facade
//!
//! [`KnowledgeAssistant`] ties one index to an ingestor and a pipeline runner and exposes
//! the operations a front end needs: ask a question, report status, add documents.

use crate::config::{AssistantConfig, EmbedderKind, PipelineSettings};
use crate::error::PipelineError;
use crate::runner::{CancelSignal, PipelineOutput, PipelineRunner};
use anyhow::Context;
use sage_infer::{CompletionProvider, EmbeddingProvider, HashingEmbedder, OllamaProvider};
use sage_retriever::{
    IndexError, IngestConfig, IngestError, IngestStats, Ingestor, SqliteIndex, VectorIndex,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Answer to a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResponse {
    /// Every stage fragment, joined by newlines
    pub response: String,
    pub final_answer: String,
}

impl From<PipelineOutput> for QueryResponse {
    fn from(output: PipelineOutput) -> Self {
        Self {
            response: output.response(),
            final_answer: output.final_answer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub status: String,
    pub document_count: usize,
    pub collection_name: String,
}

pub struct KnowledgeAssistant {
    index: Arc<dyn VectorIndex>,
    ingestor: Ingestor,
    runner: PipelineRunner,
}

impl std::fmt::Debug for KnowledgeAssistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeAssistant")
            .field("collection", &self.index.name())
            .field("runner", &self.runner)
            .finish()
    }
}

impl KnowledgeAssistant {
    /// Assemble an assistant from existing collaborators.
    pub fn new(
        index: Arc<dyn VectorIndex>,
        completer: Arc<dyn CompletionProvider>,
        ingest: IngestConfig,
        pipeline: &PipelineSettings,
    ) -> Result<Self, IngestError> {
        let ingestor = Ingestor::new(index.clone(), ingest)?;
        let runner = PipelineRunner::with_options(
            index.clone(),
            completer,
            pipeline.format.renderer(),
            pipeline.top_k,
        );
        Ok(Self {
            index,
            ingestor,
            runner,
        })
    }

    /// Open the configured index and connect to the configured Ollama server.
    pub async fn from_config(config: &AssistantConfig) -> anyhow::Result<Self> {
        let ollama = Arc::new(OllamaProvider::new(config.ollama.clone())?);
        let embedder: Arc<dyn EmbeddingProvider> = match config.index.embedder {
            EmbedderKind::Ollama => ollama.clone() as Arc<dyn EmbeddingProvider>,
            EmbedderKind::Hashing => Arc::new(HashingEmbedder::new(config.index.hashing.clone())?),
        };

        let index = SqliteIndex::open(&config.index.path, config.index.collection.clone(), embedder)
            .await
            .with_context(|| format!("Failed to open index at {}", config.index.path.display()))?;
        info!(
            "Assistant ready: model '{}' at {}, collection '{}'",
            config.ollama.model,
            config.ollama.base_url,
            index.name()
        );

        Ok(Self::new(
            Arc::new(index),
            ollama,
            config.ingest.clone(),
            &config.pipeline,
        )?)
    }

    pub fn runner(&self) -> &PipelineRunner {
        &self.runner
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    pub async fn run_query(&self, query: &str) -> Result<QueryResponse, PipelineError> {
        self.run_query_with_cancel(query, CancelSignal::never()).await
    }

    pub async fn run_query_with_cancel(
        &self,
        query: &str,
        cancel: CancelSignal,
    ) -> Result<QueryResponse, PipelineError> {
        info!("Processing query: {}", query);
        let output = self.runner.execute_with_cancel(query, cancel).await?;
        Ok(output.into())
    }

    pub async fn status(&self) -> Result<StatusReport, IndexError> {
        Ok(StatusReport {
            status: "operational".to_string(),
            document_count: self.index.count().await?,
            collection_name: self.index.name().to_string(),
        })
    }

    pub async fn ingest_file(
        &self,
        path: &Path,
        doc_type: Option<&str>,
    ) -> Result<usize, IngestError> {
        self.ingestor.ingest_file(path, doc_type).await
    }

    pub async fn ingest_directory(
        &self,
        path: &Path,
        doc_type: Option<&str>,
    ) -> Result<IngestStats, IngestError> {
        self.ingestor.ingest_directory(path, doc_type).await
    }
}
