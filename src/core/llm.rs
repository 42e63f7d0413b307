//! Chat message types and the text generation abstraction.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// A single role-tagged conversation turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Text generation collaborator. Failures here are hard: they
/// propagate to the caller and terminate the current pipeline run.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates a completion for the given conversation.
    async fn generate(&self, messages: &[ChatMessage], temperature: f64) -> Result<String>;

    /// Generates the same completion, delivered as incremental chunks
    /// on `tx`. The concatenated chunks equal the blocking result.
    async fn generate_stream(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
        tx: mpsc::Sender<String>,
    ) -> Result<()>;
}
