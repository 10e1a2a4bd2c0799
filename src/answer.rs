//! Answer composer: retrieval-augmented prompting over the vector index.
//!
//! For each question the composer retrieves the `top_k` most similar chunks,
//! renders the recent conversation, and makes exactly one language-model
//! call. The returned [`Answer`] cites every retrieved chunk, in retrieval
//! order, duplicates included.

use anyhow::Result;
use std::sync::Arc;

use crate::error::{chain, PipelineError, PipelineResult};
use crate::index::VectorIndex;
use crate::llm::{LanguageModel, Message};
use crate::models::{Answer, ConversationTurn, RetrievalResult, Role};

/// Separator placed between retrieved chunks in the prompt context.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

pub const SYSTEM_PROMPT: &str = "You are an expert developer. \
You have access to a conversation history and code context. \
Answer the user's question based on the context. \
If the user refers to previous code (e.g., \"rewrite it\" or \"that function\"), \
use the History to understand what \"it\" refers to.";

#[derive(Debug, Clone, Copy)]
pub struct AnswerConfig {
    pub top_k: usize,
    /// Most recent turns rendered into the prompt.
    pub history_turns: usize,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            top_k: 8,
            history_turns: 5,
        }
    }
}

pub struct AnswerComposer {
    index: Arc<VectorIndex>,
    llm: Arc<dyn LanguageModel>,
    config: AnswerConfig,
}

impl AnswerComposer {
    pub fn new(
        index: Arc<VectorIndex>,
        llm: Arc<dyn LanguageModel>,
        config: AnswerConfig,
    ) -> Self {
        Self { index, llm, config }
    }

    /// Retrieve context for `question` and ask the language model.
    ///
    /// Retrieval failures surface as [`PipelineError::Index`], model
    /// failures as [`PipelineError::Generation`].
    pub async fn ask(
        &self,
        question: &str,
        history: &[ConversationTurn],
    ) -> PipelineResult<Answer> {
        let results = self
            .retrieve(question)
            .await
            .map_err(|e| PipelineError::Index(chain(&e)))?;
        self.generate(question, history, &results)
            .await
            .map_err(|e| PipelineError::Generation(chain(&e)))
    }

    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievalResult>> {
        self.index.query(question, self.config.top_k).await
    }

    /// Build the prompt from already-retrieved `results` and make one model call.
    pub async fn generate(
        &self,
        question: &str,
        history: &[ConversationTurn],
        results: &[RetrievalResult],
    ) -> Result<Answer> {
        let messages = build_messages(question, history, results, self.config.history_turns);
        tracing::debug!(
            model = self.llm.model_name(),
            context_chunks = results.len(),
            history_turns = history.len().min(self.config.history_turns),
            "calling language model"
        );
        let answer = self.llm.complete(&messages).await?;

        Ok(Answer {
            answer,
            sources: results.iter().map(|r| r.metadata.clone()).collect(),
        })
    }
}

/// Render the last `max_turns` turns as `User: ...` / `AI: ...` lines.
pub fn render_history(history: &[ConversationTurn], max_turns: usize) -> String {
    let start = history.len().saturating_sub(max_turns);
    history[start..]
        .iter()
        .map(|turn| match turn.role {
            Role::User => format!("User: {}", turn.content),
            Role::Assistant => format!("AI: {}", turn.content),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_context(results: &[RetrievalResult]) -> String {
    results
        .iter()
        .map(|r| r.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// The system instruction followed by one user message carrying the
/// history, context and question sections.
pub fn build_messages(
    question: &str,
    history: &[ConversationTurn],
    results: &[RetrievalResult],
    max_turns: usize,
) -> Vec<Message> {
    let user = format!(
        "History:\n{}\n\nContext:\n{}\n\nQuestion: {}",
        render_history(history, max_turns),
        render_context(results),
        question
    );
    vec![Message::system(SYSTEM_PROMPT), Message::user(user)]
}
