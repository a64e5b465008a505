//! Chat client backed by the genai crate
//!
//! genai handles provider quirks, protocols and auth; this adapter only
//! converts between our types and genai's and keeps per-session history.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use genai::chat::{
    ChatMessage as GenaiMessage, ChatRequest, Tool as GenaiTool, ToolCall as GenaiToolCall,
};
use genai::Client;
use parking_lot::Mutex;
use uuid::Uuid;

use super::error::{ChatError, ChatResult};
use super::traits::{ChatClient, ChatReply};
use crate::logging::Logger;
use crate::types::{ChatMessage, MessageRole, Tool, ToolCall};

/// Convert our message to a genai message
fn to_genai_message(message: &ChatMessage) -> GenaiMessage {
    match message.role {
        MessageRole::System => GenaiMessage::system(message.content.clone()),
        MessageRole::User => GenaiMessage::user(message.content.clone()),
        MessageRole::Assistant => GenaiMessage::assistant(message.content.clone()),
    }
}

/// Convert our tool definition to a genai tool
fn to_genai_tool(tool: &Tool) -> GenaiTool {
    GenaiTool::new(tool.name.clone())
        .with_description(tool.description.clone())
        .with_schema(tool.input_schema.clone())
}

/// Convert a genai tool call to ours
fn from_genai_tool_call(call: GenaiToolCall) -> ToolCall {
    ToolCall {
        id: call.call_id,
        name: call.fn_name,
        arguments: call.fn_arguments,
    }
}

struct ChatSession {
    model: String,
    system_prompt: Option<String>,
    history: Vec<ChatMessage>,
}

/// Chat client for any genai-supported backend (Ollama, OpenAI, ...)
pub struct GenaiChatClient {
    client: Client,
    sessions: Mutex<HashMap<String, ChatSession>>,
    logger: Arc<dyn Logger>,
}

impl GenaiChatClient {
    /// Create a client with genai's default resolution (env vars, local Ollama)
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            client: Client::default(),
            sessions: Mutex::new(HashMap::new()),
            logger,
        }
    }

    /// Create a client over a pre-configured genai Client
    pub fn with_client(client: Client, logger: Arc<dyn Logger>) -> Self {
        Self {
            client,
            sessions: Mutex::new(HashMap::new()),
            logger,
        }
    }

    /// Number of open sessions
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

#[async_trait]
impl ChatClient for GenaiChatClient {
    async fn create_session(
        &self,
        model: &str,
        system_prompt: Option<&str>,
    ) -> ChatResult<String> {
        let session_id = Uuid::new_v4().to_string();
        self.sessions.lock().insert(
            session_id.clone(),
            ChatSession {
                model: model.to_string(),
                system_prompt: system_prompt.map(str::to_string),
                history: Vec::new(),
            },
        );

        self.logger.info(&format!(
            "[GenaiChatClient] Created session {} for model {}",
            session_id, model
        ));
        Ok(session_id)
    }

    async fn chat(&self, session_id: &str, message: &str, tools: &[Tool]) -> ChatResult<ChatReply> {
        // Snapshot the session so the lock is not held across the backend call
        let (model, mut messages) = {
            let sessions = self.sessions.lock();
            let session = sessions
                .get(session_id)
                .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))?;

            let mut messages = Vec::with_capacity(session.history.len() + 2);
            if let Some(system) = &session.system_prompt {
                messages.push(GenaiMessage::system(system.clone()));
            }
            messages.extend(session.history.iter().map(to_genai_message));
            (session.model.clone(), messages)
        };
        messages.push(GenaiMessage::user(message));

        let mut request = ChatRequest::new(messages);
        if !tools.is_empty() {
            request = request.with_tools(tools.iter().map(to_genai_tool).collect::<Vec<_>>());
        }

        self.logger.debug(&format!(
            "[GenaiChatClient] Sending message to {} with {} tools",
            model,
            tools.len()
        ));

        let response = self
            .client
            .exec_chat(&model, request, None)
            .await
            .map_err(|e| ChatError::backend(&model, e.to_string()))?;

        let content = response
            .first_text()
            .map(str::to_string)
            .unwrap_or_default();
        let tool_calls: Vec<ToolCall> = response
            .into_tool_calls()
            .into_iter()
            .map(from_genai_tool_call)
            .collect();

        // Record the exchange in the session history
        {
            let mut sessions = self.sessions.lock();
            if let Some(session) = sessions.get_mut(session_id) {
                session.history.push(ChatMessage::user(message));
                session
                    .history
                    .push(ChatMessage::assistant(content.clone()));
            }
        }

        Ok(ChatReply {
            content,
            tool_calls,
        })
    }

    async fn close_session(&self, session_id: &str) -> ChatResult<()> {
        match self.sessions.lock().remove(session_id) {
            Some(_) => {
                self.logger
                    .info(&format!("[GenaiChatClient] Closed session {}", session_id));
                Ok(())
            }
            None => Err(ChatError::SessionNotFound(session_id.to_string())),
        }
    }
}
