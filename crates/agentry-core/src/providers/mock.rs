//! Mock chat client for testing
//!
//! Provides deterministic, scripted replies without network dependencies,
//! and records every request so tests can assert on what the engine sent.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::{ChatError, ChatResult};
use super::traits::{ChatClient, ChatReply};
use crate::logging::Logger;
use crate::types::{ModelCapabilities, Tool, ToolCall};

/// One scripted reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Plain text reply
    Text(String),
    /// Reply carrying tool calls
    WithCalls(String, Vec<ToolCall>),
    /// Fail the request
    Fail(String),
}

/// A chat request as the mock observed it
#[derive(Debug, Clone)]
pub struct RecordedChat {
    /// Session the message was sent to
    pub session_id: String,
    /// The message text
    pub message: String,
    /// How many tools were offered
    pub tool_count: usize,
}

/// Mock chat backend
pub struct MockChatClient {
    script: Mutex<VecDeque<MockReply>>,
    sessions: Mutex<HashSet<String>>,
    requests: Mutex<Vec<RecordedChat>>,
    closed_sessions: Mutex<Vec<String>>,
    session_counter: AtomicUsize,
    capabilities: ModelCapabilities,
    fail_close: bool,
    logger: Arc<dyn Logger>,
}

impl MockChatClient {
    /// Create a mock that answers every request with "ok"
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            sessions: Mutex::new(HashSet::new()),
            requests: Mutex::new(Vec::new()),
            closed_sessions: Mutex::new(Vec::new()),
            session_counter: AtomicUsize::new(0),
            capabilities: ModelCapabilities::full(),
            fail_close: false,
            logger,
        }
    }

    /// Script the replies, consumed in order; afterwards falls back to "ok"
    pub fn scripted(replies: Vec<MockReply>, logger: Arc<dyn Logger>) -> Self {
        let mock = Self::new(logger);
        *mock.script.lock() = replies.into();
        mock
    }

    /// Override the fixed capability record
    pub fn with_capabilities(mut self, capabilities: ModelCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Make close_session fail, for best-effort teardown tests
    pub fn with_close_failure(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Every chat request observed so far
    pub fn requests(&self) -> Vec<RecordedChat> {
        self.requests.lock().clone()
    }

    /// Sessions closed so far
    pub fn closed_sessions(&self) -> Vec<String> {
        self.closed_sessions.lock().clone()
    }

    /// Number of open sessions
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn create_session(
        &self,
        model: &str,
        _system_prompt: Option<&str>,
    ) -> ChatResult<String> {
        let session_id = format!(
            "session-{}",
            self.session_counter.fetch_add(1, Ordering::SeqCst) + 1
        );
        self.sessions.lock().insert(session_id.clone());
        self.logger.debug(&format!(
            "[MockChatClient] Created session {} for model {}",
            session_id, model
        ));
        Ok(session_id)
    }

    async fn chat(&self, session_id: &str, message: &str, tools: &[Tool]) -> ChatResult<ChatReply> {
        if !self.sessions.lock().contains(session_id) {
            return Err(ChatError::SessionNotFound(session_id.to_string()));
        }

        self.requests.lock().push(RecordedChat {
            session_id: session_id.to_string(),
            message: message.to_string(),
            tool_count: tools.len(),
        });

        let reply = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| MockReply::Text("ok".to_string()));

        match reply {
            MockReply::Text(content) => Ok(ChatReply::text(content)),
            MockReply::WithCalls(content, calls) => {
                Ok(ChatReply::text(content).with_tool_calls(calls))
            }
            MockReply::Fail(message) => Err(ChatError::backend("mock", message)),
        }
    }

    async fn close_session(&self, session_id: &str) -> ChatResult<()> {
        if self.fail_close {
            return Err(ChatError::backend("mock", "close refused"));
        }
        self.sessions.lock().remove(session_id);
        self.closed_sessions.lock().push(session_id.to_string());
        Ok(())
    }

    fn capabilities(&self, _model: &str) -> ModelCapabilities {
        self.capabilities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use serde_json::json;

    fn test_logger() -> Arc<dyn Logger> {
        Arc::new(NoOpLogger::new())
    }

    #[tokio::test]
    async fn test_scripted_replies_in_order() {
        let mock = MockChatClient::scripted(
            vec![
                MockReply::Text("first".to_string()),
                MockReply::WithCalls(
                    "second".to_string(),
                    vec![ToolCall::new("c1", "echo", json!({}))],
                ),
            ],
            test_logger(),
        );

        let session = mock.create_session("m", None).await.unwrap();

        let first = mock.chat(&session, "hi", &[]).await.unwrap();
        assert_eq!(first.content, "first");
        assert!(!first.has_tool_calls());

        let second = mock.chat(&session, "again", &[]).await.unwrap();
        assert!(second.has_tool_calls());

        // Script exhausted: falls back to "ok"
        let third = mock.chat(&session, "more", &[]).await.unwrap();
        assert_eq!(third.content, "ok");
    }

    #[tokio::test]
    async fn test_records_requests() {
        let mock = MockChatClient::new(test_logger());
        let session = mock.create_session("m", None).await.unwrap();

        let tools = vec![Tool::new("echo", "Echo")];
        mock.chat(&session, "hello", &tools).await.unwrap();

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].message, "hello");
        assert_eq!(requests[0].tool_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_session_is_rejected() {
        let mock = MockChatClient::new(test_logger());
        let err = mock.chat("nope", "hello", &[]).await.unwrap_err();
        assert!(matches!(err, ChatError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let mock = MockChatClient::scripted(
            vec![MockReply::Fail("model melted".to_string())],
            test_logger(),
        );
        let session = mock.create_session("m", None).await.unwrap();

        let err = mock.chat(&session, "hello", &[]).await.unwrap_err();
        assert!(matches!(err, ChatError::Backend { .. }));
    }
}
