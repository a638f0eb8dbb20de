//! Traits for the agent's external collaborators: chat model, memory service, tools.

use crate::{AddOptions, MemoryMessage, MemoryRecord, Message, SearchOptions, ToolSpec};
use async_trait::async_trait;

/// Chat model with tool-calling support.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate the next assistant message for `messages`. `tools` may be empty.
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message, ChatModelError>;
}

/// Persistent memory service (Mem0 or a local stand-in).
#[async_trait]
pub trait MemoryClient: Send + Sync {
    /// Relevance search over a user's memories.
    async fn search(
        &self,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<Vec<MemoryRecord>, MemoryError>;

    /// Store conversation messages for a user.
    async fn add(&self, messages: &[MemoryMessage], opts: &AddOptions) -> Result<(), MemoryError>;

    /// Full history for a user.
    async fn get_all(&self, user_id: &str) -> Result<Vec<MemoryRecord>, MemoryError>;
}

/// A tool the agent can call.
#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> ToolSpec;

    /// Run the tool. Output is fed back to the model as a tool message.
    async fn call(&self, arguments: serde_json::Value) -> Result<String, ToolError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ChatModelError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("chat model error: {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("memory error: {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Other(String),
}
