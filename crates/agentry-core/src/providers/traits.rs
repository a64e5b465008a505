//! Chat client trait definition

use async_trait::async_trait;

use super::error::ChatResult;
use crate::types::{ModelCapabilities, Tool, ToolCall};

/// One reply from the chat backend
#[derive(Debug, Clone)]
pub struct ChatReply {
    /// The assistant's text content
    pub content: String,
    /// Tool calls the assistant requested, in order
    pub tool_calls: Vec<ToolCall>,
}

impl ChatReply {
    /// Create a plain text reply
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Attach requested tool calls
    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = calls;
        self
    }

    /// Whether the reply carries tool calls
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Chat backend abstraction
///
/// Sessions are backend-side conversation handles: the implementation owns
/// whatever per-session state (history, options) its protocol needs.
/// Implementations: `GenaiChatClient` for real backends, `MockChatClient`
/// for tests.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Open a session for a model, with an optional system prompt
    async fn create_session(&self, model: &str, system_prompt: Option<&str>)
        -> ChatResult<String>;

    /// Send one message into a session, offering the given tools
    async fn chat(&self, session_id: &str, message: &str, tools: &[Tool])
        -> ChatResult<ChatReply>;

    /// Close a session and drop its state
    async fn close_session(&self, session_id: &str) -> ChatResult<()>;

    /// Fixed capability record for a model
    fn capabilities(&self, _model: &str) -> ModelCapabilities {
        ModelCapabilities::full()
    }
}
