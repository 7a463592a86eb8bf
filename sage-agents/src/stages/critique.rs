use super::{CRITIC_OUTPUT, PipelineStage, RESPONSE_OUTPUT};
use crate::error::StageError;
use crate::prompts;
use crate::render::FragmentRenderer;
use crate::state::{PipelineState, Stage};
use async_trait::async_trait;
use sage_infer::CompletionProvider;
use std::sync::Arc;
use tracing::debug;

/// Reviews the draft, then rewrites it into the final answer.
///
/// The finalization request is only sent once the feedback has come back. A blank
/// final answer fails the stage and leaves the state untouched.
pub struct CritiqueStage {
    completer: Arc<dyn CompletionProvider>,
    renderer: Arc<dyn FragmentRenderer>,
}

impl CritiqueStage {
    pub fn new(
        completer: Arc<dyn CompletionProvider>,
        renderer: Arc<dyn FragmentRenderer>,
    ) -> Self {
        Self {
            completer,
            renderer,
        }
    }
}

#[async_trait]
impl PipelineStage for CritiqueStage {
    fn name(&self) -> &str {
        "critic"
    }

    fn stage(&self) -> Stage {
        Stage::Critique
    }

    async fn run(&self, state: &mut PipelineState) -> Result<(), StageError> {
        let query = state.query();
        let draft = state.draft()?;

        let prompt = prompts::feedback(
            query,
            state.retrieved_context()?,
            state.analysis()?,
            draft,
        );
        debug!("Feedback prompt is {} characters", prompt.chars().count());
        let feedback = self.completer.complete(&prompt).await?;

        let prompt = prompts::finalize(query, draft, &feedback);
        debug!("Finalization prompt is {} characters", prompt.chars().count());
        let final_answer = self.completer.complete(&prompt).await?;
        if final_answer.trim().is_empty() {
            return Err(StageError::EmptyResponse {
                what: "final answer",
            });
        }

        let critic = self.renderer.critique(&feedback);
        let response = self.renderer.response(&final_answer);
        state.set_feedback(feedback)?;
        state.set_final_answer(final_answer)?;
        state.push_output(CRITIC_OUTPUT, critic)?;
        state.push_output(RESPONSE_OUTPUT, response)?;
        Ok(())
    }
}
