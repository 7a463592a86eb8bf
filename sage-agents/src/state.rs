//! Shared state threaded through the pipeline stages
//!
//! A [`PipelineState`] starts with only the query. Each stage reads what earlier stages
//! wrote and records its own results; every field can be written once, and reading a
//! field nobody wrote yet is an error rather than an empty string.

use crate::error::StateError;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Position of a run in the linear pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Retrieval,
    Analysis,
    Draft,
    Critique,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Retrieval => "retrieval",
            Stage::Analysis => "analysis",
            Stage::Draft => "draft",
            Stage::Critique => "critique",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accumulated work of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineState {
    query: String,
    retrieved_context: Option<String>,
    document_count: Option<usize>,
    analysis: Option<String>,
    draft: Option<String>,
    feedback: Option<String>,
    final_answer: Option<String>,
    stage_outputs: IndexMap<String, String>,
    current_stage: Stage,
}

fn write_once<T>(slot: &mut Option<T>, field: &'static str, value: T) -> Result<(), StateError> {
    if slot.is_some() {
        return Err(StateError::AlreadySet { field });
    }
    *slot = Some(value);
    Ok(())
}

fn read<'a>(slot: &'a Option<String>, field: &'static str) -> Result<&'a str, StateError> {
    slot.as_deref().ok_or(StateError::Missing { field })
}

impl PipelineState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            retrieved_context: None,
            document_count: None,
            analysis: None,
            draft: None,
            feedback: None,
            final_answer: None,
            stage_outputs: IndexMap::new(),
            current_stage: Stage::Retrieval,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn current_stage(&self) -> Stage {
        self.current_stage
    }

    /// Move to a strictly later stage.
    pub fn advance_to(&mut self, stage: Stage) -> Result<(), StateError> {
        if stage <= self.current_stage {
            return Err(StateError::Regression {
                from: self.current_stage,
                to: stage,
            });
        }
        self.current_stage = stage;
        Ok(())
    }

    /// Record the joined passage texts and how many passages they came from.
    pub fn set_retrieved_context(
        &mut self,
        context: impl Into<String>,
        document_count: usize,
    ) -> Result<(), StateError> {
        write_once(&mut self.retrieved_context, "retrieved_context", context.into())?;
        self.document_count = Some(document_count);
        Ok(())
    }

    pub fn retrieved_context(&self) -> Result<&str, StateError> {
        read(&self.retrieved_context, "retrieved_context")
    }

    pub fn document_count(&self) -> Result<usize, StateError> {
        self.document_count.ok_or(StateError::Missing {
            field: "retrieved_context",
        })
    }

    pub fn set_analysis(&mut self, analysis: impl Into<String>) -> Result<(), StateError> {
        write_once(&mut self.analysis, "analysis", analysis.into())
    }

    pub fn analysis(&self) -> Result<&str, StateError> {
        read(&self.analysis, "analysis")
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) -> Result<(), StateError> {
        write_once(&mut self.draft, "draft", draft.into())
    }

    pub fn draft(&self) -> Result<&str, StateError> {
        read(&self.draft, "draft")
    }

    pub fn set_feedback(&mut self, feedback: impl Into<String>) -> Result<(), StateError> {
        write_once(&mut self.feedback, "feedback", feedback.into())
    }

    pub fn feedback(&self) -> Result<&str, StateError> {
        read(&self.feedback, "feedback")
    }

    pub fn set_final_answer(&mut self, answer: impl Into<String>) -> Result<(), StateError> {
        write_once(&mut self.final_answer, "final_answer", answer.into())
    }

    pub fn final_answer(&self) -> Result<&str, StateError> {
        read(&self.final_answer, "final_answer")
    }

    /// Append a rendered fragment under `key`. Keys are never overwritten.
    pub fn push_output(
        &mut self,
        key: impl Into<String>,
        fragment: impl Into<String>,
    ) -> Result<(), StateError> {
        let key = key.into();
        if self.stage_outputs.contains_key(&key) {
            return Err(StateError::DuplicateOutput { key });
        }
        self.stage_outputs.insert(key, fragment.into());
        Ok(())
    }

    /// Rendered fragments in the order the stages produced them
    pub fn stage_outputs(&self) -> &IndexMap<String, String> {
        &self.stage_outputs
    }

    pub(crate) fn into_outputs(self) -> (IndexMap<String, String>, Option<String>) {
        (self.stage_outputs, self.final_answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_has_only_query() {
        let state = PipelineState::new("What is Rust?");

        assert_eq!(state.query(), "What is Rust?");
        assert_eq!(state.current_stage(), Stage::Retrieval);
        assert_eq!(
            state.retrieved_context(),
            Err(StateError::Missing {
                field: "retrieved_context"
            })
        );
        assert!(state.analysis().is_err());
        assert!(state.final_answer().is_err());
        assert!(state.stage_outputs().is_empty());
    }

    #[test]
    fn test_fields_are_write_once() {
        let mut state = PipelineState::new("q");

        state.set_retrieved_context("", 0).unwrap();
        assert_eq!(state.retrieved_context(), Ok(""));
        assert_eq!(state.document_count(), Ok(0));
        assert_eq!(
            state.set_retrieved_context("other", 2),
            Err(StateError::AlreadySet {
                field: "retrieved_context"
            })
        );
        assert_eq!(state.document_count(), Ok(0));

        state.set_analysis("first").unwrap();
        assert!(matches!(
            state.set_analysis("second"),
            Err(StateError::AlreadySet { field: "analysis" })
        ));
        assert_eq!(state.analysis(), Ok("first"));
    }

    #[test]
    fn test_outputs_keep_insertion_order() {
        let mut state = PipelineState::new("q");
        for key in ["retriever", "research", "writer"] {
            state.push_output(key, format!("<{key}>")).unwrap();
        }

        let keys: Vec<&str> = state.stage_outputs().keys().map(String::as_str).collect();
        assert_eq!(keys, ["retriever", "research", "writer"]);

        assert_eq!(
            state.push_output("research", "again"),
            Err(StateError::DuplicateOutput {
                key: "research".to_string()
            })
        );
        assert_eq!(state.stage_outputs()["research"], "<research>");
    }

    #[test]
    fn test_stage_never_moves_backward() {
        let mut state = PipelineState::new("q");

        state.advance_to(Stage::Analysis).unwrap();
        state.advance_to(Stage::Critique).unwrap();
        assert_eq!(
            state.advance_to(Stage::Draft),
            Err(StateError::Regression {
                from: Stage::Critique,
                to: Stage::Draft
            })
        );
        assert!(state.advance_to(Stage::Critique).is_err());

        state.advance_to(Stage::Done).unwrap();
        assert_eq!(state.current_stage(), Stage::Done);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Analysis.to_string(), "analysis");
        assert!(Stage::Retrieval < Stage::Done);
    }
}
