//! Prompt templates sent to the completion provider

pub fn analysis(query: &str, context: &str) -> String {
    format!(
        "Analyze this query and context, identifying key points and relationships:\n\n\
         Query: {query}\n\n\
         Context: {context}"
    )
}

pub fn draft(query: &str, context: &str, analysis: &str) -> String {
    format!(
        "Draft a comprehensive response that addresses this query using the context and analysis:\n\n\
         Query: {query}\n\
         Context: {context}\n\
         Analysis: {analysis}"
    )
}

pub fn feedback(query: &str, context: &str, analysis: &str, draft: &str) -> String {
    format!(
        "Review this draft response and provide specific feedback:\n\
         Query: {query}\n\
         Context: {context}\n\
         Analysis: {analysis}\n\
         Draft: {draft}\n\n\
         Provide feedback on:\n\
         1. Accuracy and factual correctness\n\
         2. Completeness of response\n\
         3. Clarity and structure\n\
         4. Areas for improvement\n"
    )
}

pub fn finalize(query: &str, draft: &str, feedback: &str) -> String {
    format!(
        "Create a final polished response incorporating this feedback:\n\
         Original Query: {query}\n\
         Draft: {draft}\n\
         Feedback: {feedback}\n\n\
         Requirements:\n\
         1. Address all feedback points\n\
         2. Maintain clear structure\n\
         3. Ensure completeness\n\
         4. Polish language and flow\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_start_with_their_instruction() {
        assert!(analysis("q", "c").starts_with("Analyze this query and context"));
        assert!(draft("q", "c", "a").starts_with("Draft a comprehensive response"));
        assert!(feedback("q", "c", "a", "d").starts_with("Review this draft response"));
        assert!(finalize("q", "d", "f").starts_with("Create a final polished response"));
    }

    #[test]
    fn test_prompts_embed_inputs() {
        let prompt = feedback("Q1", "C1", "A1", "D1");
        assert!(prompt.contains("Query: Q1\nContext: C1\nAnalysis: A1\nDraft: D1\n"));

        let prompt = finalize("Q1", "D1", "F1");
        assert!(prompt.contains("Original Query: Q1\nDraft: D1\nFeedback: F1\n"));
        assert!(!prompt.contains("Context:"));
    }
}
