//! Answer generation trait and the "stuff" QA prompt.

use anyhow::Result;
use async_trait::async_trait;

/// A hosted language model that answers a question from a context blob.
#[async_trait]
pub trait Generator: Send + Sync {
    fn model_name(&self) -> &str;

    /// Returns free-text answer for `question` given `context`.
    async fn generate(&self, context: &str, question: &str) -> Result<String>;
}

/// Builds the prompt that stuffs all retrieved context in front of the
/// question.
pub fn stuff_prompt(context: &str, question: &str) -> String {
    format!(
        "Use the following pieces of context to answer the question at the end. \
         If you don't know the answer, just say that you don't know, \
         don't try to make up an answer.\n\n{}\n\nQuestion: {}\nHelpful Answer:",
        context, question
    )
}
