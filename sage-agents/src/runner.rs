//! Linear execution of the pipeline stages
//!
//! The runner owns an ordered list of [`PipelineStage`]s and drives one
//! [`PipelineState`] through them. It checks for cancellation before every stage, moves
//! the state forward only after a stage succeeds, and stops at the first failure.

use crate::error::{PipelineError, StageError, StateError};
use crate::render::{FragmentRenderer, MarkdownRenderer};
use crate::stages::{
    AnalysisStage, CritiqueStage, DEFAULT_TOP_K, DraftStage, PipelineStage, RetrievalStage,
};
use crate::state::{PipelineState, Stage};
use indexmap::IndexMap;
use sage_infer::CompletionProvider;
use sage_retriever::VectorIndex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Requests cancellation of the runs holding one of its signals.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Observes a [`CancelHandle`].
#[derive(Debug, Clone)]
pub struct CancelSignal {
    receiver: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_, receiver) = watch::channel(false);
        Self { receiver }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancellation is requested. Pending forever if the handle is gone.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        let closed = receiver.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineOutput {
    /// Rendered fragments keyed by output name, in execution order
    pub stage_outputs: IndexMap<String, String>,
    pub final_answer: String,
}

impl PipelineOutput {
    /// All fragments joined by newlines
    pub fn response(&self) -> String {
        self.stage_outputs
            .values()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Runs the stages of a query in order.
pub struct PipelineRunner {
    stages: Vec<Box<dyn PipelineStage>>,
}

impl std::fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRunner")
            .field(
                "stages",
                &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl PipelineRunner {
    /// The standard retrieve, analyze, draft, critique pipeline rendering Markdown.
    pub fn new(index: Arc<dyn VectorIndex>, completer: Arc<dyn CompletionProvider>) -> Self {
        Self::with_options(index, completer, Arc::new(MarkdownRenderer), DEFAULT_TOP_K)
    }

    pub fn with_options(
        index: Arc<dyn VectorIndex>,
        completer: Arc<dyn CompletionProvider>,
        renderer: Arc<dyn FragmentRenderer>,
        top_k: usize,
    ) -> Self {
        Self::from_stages(vec![
            Box::new(RetrievalStage::new(index, renderer.clone()).with_top_k(top_k)),
            Box::new(AnalysisStage::new(completer.clone(), renderer.clone())),
            Box::new(DraftStage::new(completer.clone(), renderer.clone())),
            Box::new(CritiqueStage::new(completer, renderer)),
        ])
    }

    /// A runner over custom stages, which must be ordered by [`PipelineStage::stage`].
    pub fn from_stages(stages: Vec<Box<dyn PipelineStage>>) -> Self {
        Self { stages }
    }

    pub async fn execute(&self, query: &str) -> Result<PipelineOutput, PipelineError> {
        self.execute_with_cancel(query, CancelSignal::never()).await
    }

    pub async fn execute_with_cancel(
        &self,
        query: &str,
        cancel: CancelSignal,
    ) -> Result<PipelineOutput, PipelineError> {
        if query.trim().is_empty() {
            return Err(PipelineError::EmptyQuery);
        }

        let mut state = PipelineState::new(query);
        self.run(&mut state, cancel).await?;

        let (stage_outputs, final_answer) = state.into_outputs();
        let final_answer = final_answer.ok_or_else(|| PipelineError::StageFailed {
            stage: Stage::Done,
            source: StageError::State(StateError::Missing {
                field: "final_answer",
            }),
        })?;
        Ok(PipelineOutput {
            stage_outputs,
            final_answer,
        })
    }

    /// Drive `state` through the remaining stages.
    ///
    /// Stages before the state's current stage are skipped, so a halted state resumes
    /// at the stage that failed. On failure the state is left at that stage, with
    /// everything earlier stages wrote still readable.
    pub async fn run(
        &self,
        state: &mut PipelineState,
        cancel: CancelSignal,
    ) -> Result<(), PipelineError> {
        let started = Instant::now();

        for (position, stage) in self.stages.iter().enumerate() {
            let current = stage.stage();
            if current < state.current_stage() {
                debug!("Skipping the {} stage, already completed", stage.name());
                continue;
            }
            if cancel.is_cancelled() {
                info!("Pipeline cancelled before the {} stage", current);
                return Err(PipelineError::Cancelled { stage: current });
            }
            if state.current_stage() < current {
                state
                    .advance_to(current)
                    .map_err(|e| PipelineError::StageFailed {
                        stage: current,
                        source: e.into(),
                    })?;
            }

            info!("=== {} stage ===", stage.name());
            let stage_started = Instant::now();
            let outcome = tokio::select! {
                biased;
                result = stage.run(state) => result,
                _ = cancel.cancelled() => {
                    info!("Pipeline cancelled during the {} stage", current);
                    return Err(PipelineError::Cancelled { stage: current });
                }
            };
            if let Err(source) = outcome {
                warn!("{} stage failed: {}", stage.name(), source);
                return Err(PipelineError::StageFailed {
                    stage: current,
                    source,
                });
            }
            info!(
                "{} stage finished in {:?}",
                stage.name(),
                stage_started.elapsed()
            );

            let next = self
                .stages
                .get(position + 1)
                .map(|s| s.stage())
                .unwrap_or(Stage::Done);
            state
                .advance_to(next)
                .map_err(|e| PipelineError::StageFailed {
                    stage: current,
                    source: e.into(),
                })?;
        }

        info!("Pipeline finished in {:?}", started.elapsed());
        Ok(())
    }
}
