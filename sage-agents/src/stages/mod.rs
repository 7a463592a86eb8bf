//! The four stages of a query run
//!
//! Each stage reads the fields earlier stages wrote into [`PipelineState`], writes its
//! own fields and appends its rendered fragment under a fixed output key. Stages never
//! retry; a failed provider or index call is returned to the runner as-is.

use crate::error::StageError;
use crate::state::{PipelineState, Stage};
use async_trait::async_trait;

mod analysis;
mod critique;
mod draft;
mod retrieval;

pub use analysis::AnalysisStage;
pub use critique::CritiqueStage;
pub use draft::DraftStage;
pub use retrieval::{DEFAULT_TOP_K, RetrievalStage};

/// Output key of the retrieval fragment
pub const RETRIEVER_OUTPUT: &str = "retriever";
/// Output key of the analysis fragment
pub const RESEARCH_OUTPUT: &str = "research";
/// Output key of the draft fragment
pub const WRITER_OUTPUT: &str = "writer";
/// Output key of the feedback fragment
pub const CRITIC_OUTPUT: &str = "critic";
/// Output key of the final answer fragment
pub const RESPONSE_OUTPUT: &str = "response";

/// One step of the pipeline.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// The pipeline state this stage runs in
    fn stage(&self) -> Stage;

    async fn run(&self, state: &mut PipelineState) -> Result<(), StageError>;
}
