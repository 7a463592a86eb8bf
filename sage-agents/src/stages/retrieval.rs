use super::{PipelineStage, RETRIEVER_OUTPUT};
use crate::error::StageError;
use crate::render::FragmentRenderer;
use crate::state::{PipelineState, Stage};
use async_trait::async_trait;
use sage_retriever::VectorIndex;
use std::sync::Arc;
use tracing::{debug, info};

/// Passages requested from the index per query
pub const DEFAULT_TOP_K: usize = 3;

/// Looks up passages for the query and records them as the run's context.
pub struct RetrievalStage {
    index: Arc<dyn VectorIndex>,
    renderer: Arc<dyn FragmentRenderer>,
    top_k: usize,
}

impl RetrievalStage {
    pub fn new(index: Arc<dyn VectorIndex>, renderer: Arc<dyn FragmentRenderer>) -> Self {
        Self {
            index,
            renderer,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

#[async_trait]
impl PipelineStage for RetrievalStage {
    fn name(&self) -> &str {
        "retriever"
    }

    fn stage(&self) -> Stage {
        Stage::Retrieval
    }

    async fn run(&self, state: &mut PipelineState) -> Result<(), StageError> {
        let mut passages = self.index.search(state.query(), self.top_k).await?;
        passages.sort_by_key(|p| p.rank);

        let context = passages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        info!(
            "Found {} documents in collection '{}'",
            passages.len(),
            self.index.name()
        );
        debug!("Retrieved context is {} characters", context.chars().count());

        let fragment = self.renderer.retrieval(passages.len(), &context);
        state.set_retrieved_context(context, passages.len())?;
        state.push_output(RETRIEVER_OUTPUT, fragment)?;
        Ok(())
    }
}
