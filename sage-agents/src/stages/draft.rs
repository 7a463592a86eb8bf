use super::{PipelineStage, WRITER_OUTPUT};
use crate::error::StageError;
use crate::prompts;
use crate::render::FragmentRenderer;
use crate::state::{PipelineState, Stage};
use async_trait::async_trait;
use sage_infer::CompletionProvider;
use std::sync::Arc;
use tracing::debug;

/// Writes a first answer from the query, context and analysis.
pub struct DraftStage {
    completer: Arc<dyn CompletionProvider>,
    renderer: Arc<dyn FragmentRenderer>,
}

impl DraftStage {
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
impl PipelineStage for DraftStage {
    fn name(&self) -> &str {
        "writer"
    }

    fn stage(&self) -> Stage {
        Stage::Draft
    }

    async fn run(&self, state: &mut PipelineState) -> Result<(), StageError> {
        let prompt = prompts::draft(
            state.query(),
            state.retrieved_context()?,
            state.analysis()?,
        );
        debug!("Draft prompt is {} characters", prompt.chars().count());

        let draft = self.completer.complete(&prompt).await?;

        let fragment = self.renderer.draft(&draft);
        state.set_draft(draft)?;
        state.push_output(WRITER_OUTPUT, fragment)?;
        Ok(())
    }
}
