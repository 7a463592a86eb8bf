//! Deterministic collaborators for unit tests

use crate::runner::CancelHandle;
use async_trait::async_trait;
use sage_infer::{CompletionProvider, InferError};
use sage_retriever::{DocumentChunk, IndexError, RetrievedPassage, VectorIndex};
use std::sync::Mutex;

enum Action {
    Reply(String),
    Fail,
    Cancel(CancelHandle, String),
}

/// Answers prompts by prefix and records every prompt it receives.
#[derive(Default)]
pub struct StubCompleter {
    rules: Vec<(String, Action)>,
    prompts: Mutex<Vec<String>>,
}

impl StubCompleter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, prefix: &str, response: &str) -> Self {
        self.rules
            .push((prefix.to_string(), Action::Reply(response.to_string())));
        self
    }

    /// Fail prompts starting with `prefix`. Takes precedence over earlier replies.
    pub fn fail_on(mut self, prefix: &str) -> Self {
        self.rules.insert(0, (prefix.to_string(), Action::Fail));
        self
    }

    /// Cancel `handle` while answering prompts starting with `prefix`
    pub fn cancel_on(mut self, prefix: &str, handle: CancelHandle) -> Self {
        let response = format!("{prefix} response");
        self.rules
            .insert(0, (prefix.to_string(), Action::Cancel(handle, response)));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for StubCompleter {
    async fn complete(&self, prompt: &str) -> sage_infer::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let rule = self
            .rules
            .iter()
            .find(|(prefix, _)| prompt.starts_with(prefix.as_str()));
        match rule {
            Some((_, Action::Reply(response))) => Ok(response.clone()),
            Some((_, Action::Cancel(handle, response))) => {
                handle.cancel();
                Ok(response.clone())
            }
            Some((_, Action::Fail)) => Err(InferError::unavailable_status("stub failure")),
            None => Ok("stub response".to_string()),
        }
    }

    fn provider_name(&self) -> &str {
        "stub"
    }
}

/// Returns fixed passages in order, or fails every search.
pub struct StaticIndex {
    passages: Vec<String>,
    fail: bool,
    requested: Mutex<Vec<usize>>,
}

impl StaticIndex {
    pub fn new<I, S>(passages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            passages: passages.into_iter().map(Into::into).collect(),
            fail: false,
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::<String>::new())
        }
    }

    /// `k` of every search so far
    pub fn requested_k(&self) -> Vec<usize> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorIndex for StaticIndex {
    async fn add(&self, chunks: &[DocumentChunk]) -> Result<usize, IndexError> {
        Ok(chunks.len())
    }

    async fn search(&self, _query: &str, k: usize) -> Result<Vec<RetrievedPassage>, IndexError> {
        self.requested.lock().unwrap().push(k);
        if self.fail {
            return Err(IndexError::corrupt("static index failure"));
        }
        Ok(self
            .passages
            .iter()
            .take(k)
            .enumerate()
            .map(|(rank, text)| RetrievedPassage {
                text: text.clone(),
                score: 1.0 - rank as f32 * 0.1,
                rank,
                source: format!("doc{rank}.txt"),
            })
            .collect())
    }

    async fn count(&self) -> Result<usize, IndexError> {
        Ok(self.passages.len())
    }

    fn name(&self) -> &str {
        "static"
    }
}
