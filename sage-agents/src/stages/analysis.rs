use super::{PipelineStage, RESEARCH_OUTPUT};
use crate::error::StageError;
use crate::prompts;
use crate::render::FragmentRenderer;
use crate::state::{PipelineState, Stage};
use async_trait::async_trait;
use sage_infer::CompletionProvider;
use std::sync::Arc;
use tracing::debug;

/// Asks the model for the key points and relationships between query and context.
pub struct AnalysisStage {
    completer: Arc<dyn CompletionProvider>,
    renderer: Arc<dyn FragmentRenderer>,
}

impl AnalysisStage {
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
impl PipelineStage for AnalysisStage {
    fn name(&self) -> &str {
        "researcher"
    }

    fn stage(&self) -> Stage {
        Stage::Analysis
    }

    async fn run(&self, state: &mut PipelineState) -> Result<(), StageError> {
        let prompt = prompts::analysis(state.query(), state.retrieved_context()?);
        debug!("Analysis prompt is {} characters", prompt.chars().count());

        let analysis = self.completer.complete(&prompt).await?;

        let fragment = self.renderer.analysis(state.query(), &analysis);
        state.set_analysis(analysis)?;
        state.push_output(RESEARCH_OUTPUT, fragment)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StateError;
    use crate::render::MarkdownRenderer;
    use crate::testing::StubCompleter;

    #[tokio::test]
    async fn test_analysis_recorded_with_query() -> anyhow::Result<()> {
        let completer = Arc::new(StubCompleter::new().reply("Analyze", "Key point: Paris"));
        let stage = AnalysisStage::new(completer.clone(), Arc::new(MarkdownRenderer));
        let mut state = PipelineState::new("capital of France?");
        state.set_retrieved_context("Paris is the capital of France.", 1)?;

        stage.run(&mut state).await?;

        assert_eq!(state.analysis()?, "Key point: Paris");
        let fragment = &state.stage_outputs()[RESEARCH_OUTPUT];
        assert!(fragment.contains("Key point: Paris"));
        assert!(fragment.contains("capital of France?"));

        let prompts = completer.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Context: Paris is the capital of France."));
        Ok(())
    }

    #[tokio::test]
    async fn test_requires_retrieved_context() {
        let completer = Arc::new(StubCompleter::new());
        let stage = AnalysisStage::new(completer.clone(), Arc::new(MarkdownRenderer));
        let mut state = PipelineState::new("q");

        let result = stage.run(&mut state).await;

        assert!(matches!(
            result,
            Err(StageError::State(StateError::Missing {
                field: "retrieved_context"
            }))
        ));
        assert!(completer.prompts().is_empty());
    }
}
