//! Error types for the query pipeline

use crate::state::Stage;
use sage_infer::InferError;
use sage_retriever::IndexError;
use thiserror::Error;

/// Violations of the write-once and ordering rules of [`crate::PipelineState`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("`{field}` has already been written")]
    AlreadySet { field: &'static str },

    #[error("`{field}` has not been written yet")]
    Missing { field: &'static str },

    #[error("stage output `{key}` has already been recorded")]
    DuplicateOutput { key: String },

    #[error("cannot move from {from} to {to}")]
    Regression { from: Stage, to: Stage },
}

/// Error raised by a single pipeline stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("inference failed: {0}")]
    Inference(#[from] InferError),

    #[error("retrieval failed: {0}")]
    Index(#[from] IndexError),

    #[error("model returned an empty {what}")]
    EmptyResponse { what: &'static str },

    #[error(transparent)]
    State(#[from] StateError),
}

/// Error returned by [`crate::PipelineRunner`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} stage failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: StageError,
    },

    #[error("cancelled before the {stage} stage")]
    Cancelled { stage: Stage },

    #[error("query must not be empty")]
    EmptyQuery,
}

impl PipelineError {
    /// Stage the pipeline halted at, if it started
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::StageFailed { stage, .. } | PipelineError::Cancelled { stage } => {
                Some(*stage)
            }
            PipelineError::EmptyQuery => None,
        }
    }
}
