//! Presentation of stage results
//!
//! Stages hand their structured results to a [`FragmentRenderer`] and store whatever it
//! returns under their output key. [`MarkdownRenderer`] produces collapsible `<details>`
//! blocks for chat front ends; [`PlainRenderer`] produces bare text for terminals.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Turns stage results into display fragments.
pub trait FragmentRenderer: Send + Sync {
    fn retrieval(&self, document_count: usize, context: &str) -> String;

    fn analysis(&self, query: &str, analysis: &str) -> String;

    fn draft(&self, draft: &str) -> String;

    fn critique(&self, feedback: &str) -> String;

    fn response(&self, final_answer: &str) -> String;
}

/// Markdown with HTML `<details>` sections.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl FragmentRenderer for MarkdownRenderer {
    fn retrieval(&self, document_count: usize, context: &str) -> String {
        format!(
            "<details open>\n\
             <summary>### 📚 Retrieved Documents</summary>\n\n\
             Found {document_count} relevant documents.\n\n\
             <details>\n\
             <summary>Document Content</summary>\n\n\
             ```\n{context}\n```\n\n\
             </details>\n\n\
             </details>\n"
        )
    }

    fn analysis(&self, query: &str, analysis: &str) -> String {
        format!(
            "<details open>\n\
             <summary>### 🔍 Research Analysis</summary>\n\n\
             {analysis}\n\n\
             <details>\n\
             <summary>Analysis Details</summary>\n\n\
             - Query: {query}\n\n\
             </details>\n\n\
             </details>\n"
        )
    }

    fn draft(&self, draft: &str) -> String {
        format!(
            "<details open>\n\
             <summary>### ✍️ Initial Draft</summary>\n\n\
             {draft}\n\n\
             </details>\n"
        )
    }

    fn critique(&self, feedback: &str) -> String {
        format!(
            "<details open>\n\
             <summary>### 🎯 Review & Refinement</summary>\n\n\
             <details>\n\
             <summary>Feedback Summary</summary>\n\n\
             {feedback}\n\n\
             </details>\n\n\
             </details>\n"
        )
    }

    fn response(&self, final_answer: &str) -> String {
        format!(
            "<details open>\n\
             <summary>### 🎬 Final Response</summary>\n\n\
             {final_answer}\n\n\
             </details>\n"
        )
    }
}

/// Unadorned text, one labelled section per fragment.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRenderer;

impl FragmentRenderer for PlainRenderer {
    fn retrieval(&self, document_count: usize, context: &str) -> String {
        if context.is_empty() {
            format!("Retrieved documents: {document_count}\n")
        } else {
            format!("Retrieved documents: {document_count}\n\n{context}\n")
        }
    }

    fn analysis(&self, query: &str, analysis: &str) -> String {
        format!("Analysis of \"{query}\":\n\n{analysis}\n")
    }

    fn draft(&self, draft: &str) -> String {
        format!("Draft:\n\n{draft}\n")
    }

    fn critique(&self, feedback: &str) -> String {
        format!("Feedback:\n\n{feedback}\n")
    }

    fn response(&self, final_answer: &str) -> String {
        format!("Final response:\n\n{final_answer}\n")
    }
}

/// Renderer selection as it appears in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    #[default]
    Markdown,
    Plain,
}

impl RenderFormat {
    pub fn renderer(self) -> Arc<dyn FragmentRenderer> {
        match self {
            RenderFormat::Markdown => Arc::new(MarkdownRenderer),
            RenderFormat::Plain => Arc::new(PlainRenderer),
        }
    }
}
