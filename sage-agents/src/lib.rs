//! # sage-agents
//!
//! The query side of sage: a fixed chain of stages that turns a question into an
//! answer grounded in the documents of a [`sage_retriever`] index.
//!
//! ## Pipeline
//!
//! ```text
//! Retrieval ──► Analysis ──► Draft ──► Critique ──► Done
//! ```
//!
//! - **Retrieval** searches the index and records the joined passages as context
//! - **Analysis** asks the model for the key points of query and context
//! - **Draft** writes a first answer from query, context and analysis
//! - **Critique** asks for feedback on the draft, then for a final answer using it
//!
//! Every stage appends a rendered fragment to the run's [`PipelineState`]; the
//! fragments, in order, are the response a front end shows. The runner stops at the
//! first failure and never retries; retries belong to the inference provider.
//!
//! ## Usage
//!
//! ```no_run
//! use sage_agents::{AssistantConfig, KnowledgeAssistant};
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AssistantConfig::load(None)?;
//! let assistant = KnowledgeAssistant::from_config(&config).await?;
//!
//! assistant.ingest_directory(Path::new("notes"), None).await?;
//! let answer = assistant.run_query("What did I decide about the roadmap?").await?;
//! println!("{}", answer.final_answer);
//! # Ok(())
//! # }
//! ```
//!
//! The `sage` binary wraps the same facade: `sage ingest <PATH>`, `sage query <TEXT>`
//! and `sage status`.

pub mod config;
pub mod error;
pub mod prompts;
pub mod render;
pub mod runner;
pub mod service;
pub mod stages;
pub mod state;

#[cfg(test)]
mod testing;

pub use config::{AssistantConfig, EmbedderKind, IndexSettings, PipelineSettings};
pub use error::{PipelineError, StageError, StateError};
pub use render::{FragmentRenderer, MarkdownRenderer, PlainRenderer, RenderFormat};
pub use runner::{CancelHandle, CancelSignal, PipelineOutput, PipelineRunner};
pub use service::{KnowledgeAssistant, QueryResponse, StatusReport};
pub use stages::{AnalysisStage, CritiqueStage, DraftStage, PipelineStage, RetrievalStage};
pub use state::{PipelineState, Stage};
