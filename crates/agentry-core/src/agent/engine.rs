//! Orchestration engine: one message turn end to end

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::conversation::{Conversation, ConversationStore, DEFAULT_MESSAGE_CAP, DEFAULT_RESULT_CAP};
use crate::logging::Logger;
use crate::mcp::ConnectionManager;
use crate::providers::{ChatClient, ChatError};
use crate::tools::{ToolDescriptor, ToolRegistry};
use crate::types::{ChatMessage, ToolCall, ToolResult};

/// Errors surfaced to the engine's caller
///
/// Tool-execution failures never show up here: they degrade to failed
/// `ToolResult`s inside the turn. Only a missing conversation or a chat
/// backend failure crosses this boundary.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("conversation {0} not found")]
    ConversationNotFound(String),

    #[error(transparent)]
    Chat(#[from] ChatError),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Engine limits and defaults
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model used when a conversation does not name one
    pub default_model: String,
    /// Message-history capacity per conversation
    pub max_messages: usize,
    /// Tool-result capacity per conversation
    pub max_tool_results: usize,
    /// Conversations idle longer than this are reaped
    pub max_conversation_age: chrono::Duration,
    /// Upper bound on one tool call, applied by the engine on top of the
    /// per-server timeout
    pub tool_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            default_model: "llama3.2".to_string(),
            max_messages: DEFAULT_MESSAGE_CAP,
            max_tool_results: DEFAULT_RESULT_CAP,
            max_conversation_age: chrono::Duration::hours(24),
            tool_timeout: Duration::from_secs(60),
        }
    }
}

/// Summary of one conversation
#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub message_count: usize,
    pub available_tools_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of one message turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub conversation_id: String,
    /// The turn's final assistant reply
    pub reply: String,
    /// Results of the tool round, in call order; empty when no tools ran
    pub tool_results: Vec<ToolResult>,
    pub had_tool_calls: bool,
    pub timestamp: DateTime<Utc>,
}

/// Snapshot of the tools currently offered to conversations
#[derive(Debug, Clone)]
pub struct ToolInventory {
    pub tools: Vec<ToolDescriptor>,
    pub count: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Overall engine status
#[derive(Debug, Clone)]
pub struct AgentStatus {
    pub active_conversations: usize,
    pub available_tools: usize,
    pub connected_servers: usize,
    pub total_servers: usize,
    pub tools_last_updated: Option<DateTime<Utc>>,
}

/// Drives conversations: chat dispatch, tool execution, follow-up assembly
///
/// Constructed once at process start and shared via Arc; there is no
/// ambient global instance.
pub struct AgentEngine {
    store: Arc<ConversationStore>,
    registry: Arc<ToolRegistry>,
    manager: Arc<ConnectionManager>,
    chat: Arc<dyn ChatClient>,
    config: AgentConfig,
    logger: Arc<dyn Logger>,
}

impl AgentEngine {
    /// Create an engine over its collaborators
    pub fn new(
        store: Arc<ConversationStore>,
        registry: Arc<ToolRegistry>,
        manager: Arc<ConnectionManager>,
        chat: Arc<dyn ChatClient>,
        config: AgentConfig,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            store,
            registry,
            manager,
            chat,
            config,
            logger,
        }
    }

    /// The conversation store this engine drives
    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// The engine's limits and defaults
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// The chat backend this engine dispatches to
    pub fn chat(&self) -> &Arc<dyn ChatClient> {
        &self.chat
    }

    /// Create a new conversation
    ///
    /// Opens a backend session, snapshots the current tool registry, and
    /// stores an empty bounded history. The id is allocated when absent.
    pub async fn create_conversation(
        &self,
        model: Option<&str>,
        system_prompt: Option<&str>,
        conversation_id: Option<String>,
    ) -> AgentResult<ConversationSummary> {
        let conversation_id =
            conversation_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let model = model.unwrap_or(&self.config.default_model).to_string();

        let session_id = self.chat.create_session(&model, system_prompt).await?;
        let tools_snapshot = self.registry.descriptors().as_ref().clone();
        let tools_count = tools_snapshot.len();

        let conversation = Conversation::new(
            conversation_id.clone(),
            session_id,
            model.clone(),
            system_prompt.map(str::to_string),
            tools_snapshot,
            self.config.max_messages,
            self.config.max_tool_results,
        );
        let handle = self.store.insert(conversation);

        self.logger.info(&format!(
            "[AgentEngine] Created conversation {} on model {} ({} tools available)",
            conversation_id, model, tools_count
        ));

        let conversation = handle.read();
        Ok(ConversationSummary {
            conversation_id,
            model,
            system_prompt: conversation.system_prompt.clone(),
            message_count: 0,
            available_tools_count: tools_count,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        })
    }

    /// Drive one message turn
    ///
    /// Sends the message with the live tool set, executes any requested
    /// tool calls sequentially (result order == call order), and when tools
    /// ran sends one follow-up request whose reply becomes the turn's final
    /// assistant message. Chat backend failures propagate; every tool
    /// failure is captured in the returned results instead.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        message: &str,
    ) -> AgentResult<TurnOutcome> {
        let handle = self
            .store
            .get(conversation_id)
            .ok_or_else(|| AgentError::ConversationNotFound(conversation_id.to_string()))?;

        let (session_id, model) = {
            let conversation = handle.read();
            (conversation.session_id.clone(), conversation.model.clone())
        };

        // An empty tool set is valid: the model just gets no tools this turn
        let tools = if self.chat.capabilities(&model).tool_calling {
            self.registry.llm_tools()
        } else {
            Vec::new()
        };

        let reply = self.chat.chat(&session_id, message, &tools).await?;
        handle.write().push_message(ChatMessage::user(message));

        if !reply.has_tool_calls() {
            handle
                .write()
                .push_message(ChatMessage::assistant(&reply.content));
            return Ok(TurnOutcome {
                conversation_id: conversation_id.to_string(),
                reply: reply.content,
                tool_results: Vec::new(),
                had_tool_calls: false,
                timestamp: Utc::now(),
            });
        }

        handle.write().push_message(
            ChatMessage::assistant(&reply.content).with_tool_calls(reply.tool_calls.clone()),
        );

        // Sequential dispatch, preserving result order == call order
        let mut results = Vec::with_capacity(reply.tool_calls.len());
        for call in &reply.tool_calls {
            let result = self.execute_tool_call(call).await;
            handle.write().push_tool_result(result.clone());
            results.push(result);
        }

        // One follow-up request, no further tool rounds
        let followup_prompt = build_followup_message(&results);
        let followup = self.chat.chat(&session_id, &followup_prompt, &[]).await?;
        handle
            .write()
            .push_message(ChatMessage::assistant(&followup.content));

        Ok(TurnOutcome {
            conversation_id: conversation_id.to_string(),
            reply: followup.content,
            tool_results: results,
            had_tool_calls: true,
            timestamp: Utc::now(),
        })
    }

    /// Validate, resolve and dispatch one tool call
    ///
    /// Malformed calls fail locally without contacting any server. The
    /// dispatch re-resolves the tool against the live registry; the
    /// creation-time snapshot is advisory only.
    async fn execute_tool_call(&self, call: &ToolCall) -> ToolResult {
        if call.name.trim().is_empty() {
            return ToolResult::failure(
                "invalid",
                call.arguments.clone(),
                "Tool name is required and must be a string",
            );
        }
        if !call.arguments.is_object() {
            return ToolResult::failure(
                &call.name,
                Value::Object(Default::default()),
                "Tool arguments must be an object",
            );
        }

        let Some(descriptor) = self.registry.find_by_name(&call.name) else {
            return ToolResult::failure(
                &call.name,
                call.arguments.clone(),
                format!("Tool '{}' not found in available tools", call.name),
            );
        };

        let started = Instant::now();
        let outcome = tokio::time::timeout(
            self.config.tool_timeout,
            self.manager
                .execute_tool(&descriptor.server_id, &call.name, call.arguments.clone()),
        )
        .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(payload)) => {
                ToolResult::success(&call.name, call.arguments.clone(), unwrap_payload(&payload))
                    .with_duration_ms(duration_ms)
            }
            Ok(Err(e)) => {
                self.logger.error(&format!(
                    "[AgentEngine] Tool execution failed for {}: {}",
                    call.name, e
                ));
                ToolResult::failure(&call.name, call.arguments.clone(), e.to_string())
                    .with_duration_ms(duration_ms)
            }
            Err(_) => ToolResult::failure(
                &call.name,
                call.arguments.clone(),
                format!(
                    "Tool execution timed out after {} seconds",
                    self.config.tool_timeout.as_secs()
                ),
            )
            .with_duration_ms(duration_ms),
        }
    }

    /// Conversation summary, if it exists
    pub fn get_conversation(&self, conversation_id: &str) -> Option<ConversationSummary> {
        let handle = self.store.get(conversation_id)?;
        let conversation = handle.read();
        Some(ConversationSummary {
            conversation_id: conversation.id.clone(),
            model: conversation.model.clone(),
            system_prompt: conversation.system_prompt.clone(),
            message_count: conversation.message_count(),
            available_tools_count: self.registry.tool_count(),
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        })
    }

    /// Message history of a conversation, oldest first
    pub fn get_history(&self, conversation_id: &str) -> AgentResult<Vec<ChatMessage>> {
        let handle = self
            .store
            .get(conversation_id)
            .ok_or_else(|| AgentError::ConversationNotFound(conversation_id.to_string()))?;
        let history = handle.read().history();
        Ok(history)
    }

    /// Delete a conversation
    ///
    /// The backend session is closed best-effort: a close failure is logged
    /// and deletion proceeds regardless. Returns false if the conversation
    /// did not exist.
    pub async fn delete_conversation(&self, conversation_id: &str) -> bool {
        let Some(handle) = self.store.get(conversation_id) else {
            return false;
        };

        let session_id = handle.read().session_id.clone();
        if let Err(e) = self.chat.close_session(&session_id).await {
            self.logger.error(&format!(
                "[AgentEngine] Failed to close session for conversation {}: {}",
                conversation_id, e
            ));
        }

        self.store.remove(conversation_id);
        self.logger.info(&format!(
            "[AgentEngine] Deleted conversation {}",
            conversation_id
        ));
        true
    }

    /// The tools currently offered to conversations
    pub fn available_tools(&self) -> ToolInventory {
        let tools = self.registry.descriptors().as_ref().clone();
        ToolInventory {
            count: tools.len(),
            last_updated: self.registry.last_refresh(),
            tools,
        }
    }

    /// Overall engine status
    pub fn status(&self) -> AgentStatus {
        AgentStatus {
            active_conversations: self.store.len(),
            available_tools: self.registry.tool_count(),
            connected_servers: self.manager.connected_count(),
            total_servers: self.manager.server_count(),
            tools_last_updated: self.registry.last_refresh(),
        }
    }
}

/// Unwrap a raw tool payload into a single display string
///
/// Fallback chain: a `content` field wins, then a `data` field, then the
/// payload's own string form.
pub(crate) fn unwrap_payload(payload: &Value) -> String {
    if let Some(object) = payload.as_object() {
        if let Some(content) = object.get("content") {
            return display_value(content);
        }
        if let Some(data) = object.get("data") {
            return display_value(data);
        }
    }
    display_value(payload)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        // MCP content arrays carry text items; join them
        Value::Array(items) => items
            .iter()
            .map(|item| match item.get("text").and_then(Value::as_str) {
                Some(text) => text.to_string(),
                None => item.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

/// Build the follow-up request enumerating a tool round's results
pub(crate) fn build_followup_message(results: &[ToolResult]) -> String {
    let mut summary = String::from("Tool execution completed. Results:\n");
    for (index, result) in results.iter().enumerate() {
        let status = if result.success {
            "✅ Success"
        } else {
            "❌ Failed"
        };
        summary.push_str(&format!("{}. {}: {}\n", index + 1, result.tool, status));
        if result.success {
            let mut text = result.output.clone();
            if text.chars().count() > 500 {
                text = format!(
                    "{}... (truncated)",
                    text.chars().take(500).collect::<String>()
                );
            }
            summary.push_str(&format!("   Result: {}\n", text));
        } else {
            summary.push_str(&format!(
                "   Error: {}\n",
                result.error.as_deref().unwrap_or("unknown error")
            ));
        }
        summary.push('\n');
    }

    format!(
        "Please respond to the user based on these tool results:\n\n{}",
        summary
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::mcp::testing::{MockConnector, MockTransport};
    use crate::mcp::RawTool;
    use crate::providers::{MockChatClient, MockReply};
    use crate::types::{ModelCapabilities, ServerConfig};
    use serde_json::json;

    fn test_logger() -> Arc<dyn Logger> {
        Arc::new(NoOpLogger::new())
    }

    struct Fixture {
        engine: AgentEngine,
        chat: Arc<MockChatClient>,
    }

    /// Engine over one connected server exposing `big` (2000-char payload)
    /// and `boom` (always fails), with the given chat script
    async fn fixture(replies: Vec<MockReply>) -> Fixture {
        fixture_with(replies, AgentConfig::default(), ModelCapabilities::full()).await
    }

    async fn fixture_with(
        replies: Vec<MockReply>,
        config: AgentConfig,
        capabilities: ModelCapabilities,
    ) -> Fixture {
        let transport = Arc::new(
            MockTransport::new(vec![
                RawTool::new("big", "Returns a large payload", json!({"type": "object"})),
                RawTool::new("boom", "Always fails", json!({"type": "object"})),
                RawTool::new("slow", "Never finishes in time", json!({"type": "object"})),
            ])
            .with_response("big", json!({"content": "x".repeat(2_000)}))
            .with_call_error("boom", "tool exploded")
            .with_call_delay_ms("slow", 5_000),
        );
        let connector = Arc::new(MockConnector::with_transports(vec![transport]));
        let manager = Arc::new(ConnectionManager::new(connector, test_logger()));
        manager
            .add_server(ServerConfig::stdio("srv", "Server", "tool-server"))
            .await;

        let registry = Arc::new(ToolRegistry::new(manager.clone(), test_logger()));
        registry.refresh();

        let chat = Arc::new(
            MockChatClient::scripted(replies, test_logger()).with_capabilities(capabilities),
        );
        let engine = AgentEngine::new(
            Arc::new(ConversationStore::new()),
            registry,
            manager,
            chat.clone(),
            config,
            test_logger(),
        );

        Fixture { engine, chat }
    }

    #[tokio::test]
    async fn test_create_conversation_defaults() {
        let f = fixture(vec![]).await;

        let summary = f.engine.create_conversation(None, None, None).await.unwrap();
        assert_eq!(summary.model, "llama3.2");
        assert_eq!(summary.available_tools_count, 3);
        assert!(!summary.conversation_id.is_empty());

        let explicit = f
            .engine
            .create_conversation(Some("other-model"), Some("be brief"), Some("conv-9".into()))
            .await
            .unwrap();
        assert_eq!(explicit.conversation_id, "conv-9");
        assert_eq!(explicit.model, "other-model");
        assert_eq!(explicit.system_prompt.as_deref(), Some("be brief"));
    }

    #[tokio::test]
    async fn test_send_message_unknown_conversation() {
        let f = fixture(vec![]).await;
        let err = f.engine.send_message("missing", "hello").await.unwrap_err();
        assert!(matches!(err, AgentError::ConversationNotFound(_)));
    }

    #[tokio::test]
    async fn test_turn_without_tool_calls() {
        let f = fixture(vec![MockReply::Text("just an answer".into())]).await;

        let conv = f.engine.create_conversation(None, None, None).await.unwrap();
        let outcome = f
            .engine
            .send_message(&conv.conversation_id, "hello")
            .await
            .unwrap();

        assert_eq!(outcome.reply, "just an answer");
        assert!(!outcome.had_tool_calls);
        assert!(outcome.tool_results.is_empty());

        let history = f.engine.get_history(&conv.conversation_id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "hello");
        assert_eq!(history[1].content, "just an answer");

        // The live tool set was offered
        assert_eq!(f.chat.requests()[0].tool_count, 3);
    }

    #[tokio::test]
    async fn test_turn_with_tool_round_builds_followup() {
        let f = fixture(vec![
            MockReply::WithCalls(
                "checking".into(),
                vec![
                    ToolCall::new("c1", "big", json!({})),
                    ToolCall::new("c2", "boom", json!({})),
                ],
            ),
            MockReply::Text("summarized for you".into()),
        ])
        .await;

        let conv = f.engine.create_conversation(None, None, None).await.unwrap();
        let outcome = f
            .engine
            .send_message(&conv.conversation_id, "run both")
            .await
            .unwrap();

        assert!(outcome.had_tool_calls);
        assert_eq!(outcome.reply, "summarized for you");
        assert_eq!(outcome.tool_results.len(), 2);
        assert!(outcome.tool_results[0].success);
        assert!(!outcome.tool_results[1].success);

        // Result order == call order, and the follow-up lists both
        let requests = f.chat.requests();
        assert_eq!(requests.len(), 2);
        let followup = &requests[1].message;
        assert!(followup.starts_with("Please respond to the user based on these tool results:"));
        assert!(followup.contains("1. big: ✅ Success"));
        assert!(followup.contains("2. boom: ❌ Failed"));
        assert!(followup.contains("   Error: "));
        assert!(followup.contains("tool exploded"));
        assert!(followup.contains("... (truncated)"));
        // Truncated to exactly 500 payload chars
        assert!(followup.contains(&format!("   Result: {}... (truncated)", "x".repeat(500))));
        assert!(!followup.contains(&"x".repeat(501)));
        // No tools are offered on the follow-up
        assert_eq!(requests[1].tool_count, 0);

        // Both turns plus the user message were stored
        let history = f.engine.get_history(&conv.conversation_id).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].tool_calls.len(), 2);
        assert_eq!(history[2].content, "summarized for you");

        // Tool results were appended to the conversation ring
        let handle = f.engine.store().get(&conv.conversation_id).unwrap();
        assert_eq!(handle.read().tool_results().len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_calls_fail_locally() {
        let f = fixture(vec![
            MockReply::WithCalls(
                "".into(),
                vec![
                    ToolCall::new("c1", "", json!({})),
                    ToolCall::new("c2", "big", json!("not an object")),
                    ToolCall::new("c3", "nonexistent", json!({})),
                ],
            ),
            MockReply::Text("done".into()),
        ])
        .await;

        let conv = f.engine.create_conversation(None, None, None).await.unwrap();
        let outcome = f
            .engine
            .send_message(&conv.conversation_id, "go")
            .await
            .unwrap();

        assert_eq!(outcome.tool_results.len(), 3);
        assert!(outcome.tool_results.iter().all(|r| !r.success));
        assert_eq!(outcome.tool_results[0].tool, "invalid");
        assert!(outcome.tool_results[1]
            .error
            .as_deref()
            .unwrap()
            .contains("must be an object"));
        assert!(outcome.tool_results[2]
            .error
            .as_deref()
            .unwrap()
            .contains("not found"));
    }

    #[tokio::test]
    async fn test_stale_registry_entry_degrades_to_result() {
        let transport = Arc::new(MockTransport::new(vec![RawTool::new(
            "echo",
            "Echo",
            json!({"type": "object"}),
        )]));
        let connector = Arc::new(MockConnector::with_transports(vec![transport]));
        let manager = Arc::new(ConnectionManager::new(connector, test_logger()));
        manager
            .add_server(ServerConfig::stdio("srv", "Server", "tool-server"))
            .await;

        let registry = Arc::new(ToolRegistry::new(manager.clone(), test_logger()));
        registry.refresh();

        let chat = Arc::new(MockChatClient::scripted(
            vec![
                MockReply::WithCalls("".into(), vec![ToolCall::new("c1", "echo", json!({}))]),
                MockReply::Text("done".into()),
            ],
            test_logger(),
        ));
        let engine = AgentEngine::new(
            Arc::new(ConversationStore::new()),
            registry,
            manager.clone(),
            chat,
            AgentConfig::default(),
            test_logger(),
        );

        let conv = engine.create_conversation(None, None, None).await.unwrap();

        // The server drops out between refresh and dispatch; the registry
        // entry is stale and execution must re-check the live registry
        manager.remove_server("srv").await;

        let outcome = engine
            .send_message(&conv.conversation_id, "go")
            .await
            .unwrap();
        let result = &outcome.tool_results[0];
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_tool_timeout_is_captured_as_result() {
        let config = AgentConfig {
            tool_timeout: Duration::from_secs(1),
            ..Default::default()
        };
        let f = fixture_with(
            vec![
                MockReply::WithCalls("".into(), vec![ToolCall::new("c1", "slow", json!({}))]),
                MockReply::Text("done".into()),
            ],
            config,
            ModelCapabilities::full(),
        )
        .await;

        let conv = f.engine.create_conversation(None, None, None).await.unwrap();
        let outcome = f
            .engine
            .send_message(&conv.conversation_id, "go")
            .await
            .unwrap();

        let result = &outcome.tool_results[0];
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("timed out"));
        // The turn completed instead of erroring
        assert_eq!(outcome.reply, "done");
    }

    #[tokio::test]
    async fn test_chat_failure_propagates() {
        let f = fixture(vec![MockReply::Fail("backend down".into())]).await;

        let conv = f.engine.create_conversation(None, None, None).await.unwrap();
        let err = f
            .engine
            .send_message(&conv.conversation_id, "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Chat(_)));

        // The failed turn stored nothing
        let history = f.engine.get_history(&conv.conversation_id).unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_capability_record_gates_tool_offering() {
        let f = fixture_with(
            vec![MockReply::Text("plain".into())],
            AgentConfig::default(),
            ModelCapabilities::default(),
        )
        .await;

        let conv = f.engine.create_conversation(None, None, None).await.unwrap();
        f.engine
            .send_message(&conv.conversation_id, "hello")
            .await
            .unwrap();

        assert_eq!(f.chat.requests()[0].tool_count, 0);
    }

    #[tokio::test]
    async fn test_delete_conversation_closes_session() {
        let f = fixture(vec![]).await;
        let conv = f.engine.create_conversation(None, None, None).await.unwrap();

        assert!(f.engine.delete_conversation(&conv.conversation_id).await);
        assert!(f.engine.store().is_empty());
        assert_eq!(f.chat.closed_sessions(), vec!["session-1".to_string()]);

        assert!(!f.engine.delete_conversation(&conv.conversation_id).await);
    }

    #[tokio::test]
    async fn test_delete_proceeds_when_close_fails() {
        let transport = Arc::new(MockTransport::new(vec![]));
        let connector = Arc::new(MockConnector::with_transports(vec![transport]));
        let manager = Arc::new(ConnectionManager::new(connector, test_logger()));
        let registry = Arc::new(ToolRegistry::new(manager.clone(), test_logger()));
        let chat = Arc::new(MockChatClient::new(test_logger()).with_close_failure());
        let engine = AgentEngine::new(
            Arc::new(ConversationStore::new()),
            registry,
            manager,
            chat,
            AgentConfig::default(),
            test_logger(),
        );

        let conv = engine.create_conversation(None, None, None).await.unwrap();
        assert!(engine.delete_conversation(&conv.conversation_id).await);
        assert!(engine.store().is_empty());
    }

    #[tokio::test]
    async fn test_status_and_inventory() {
        let f = fixture(vec![]).await;
        f.engine.create_conversation(None, None, None).await.unwrap();

        let status = f.engine.status();
        assert_eq!(status.active_conversations, 1);
        assert_eq!(status.available_tools, 3);
        assert_eq!(status.connected_servers, 1);
        assert_eq!(status.total_servers, 1);

        let inventory = f.engine.available_tools();
        assert_eq!(inventory.count, 3);
        assert!(inventory.last_updated.is_some());
    }

    #[test]
    fn test_unwrap_payload_fallback_chain() {
        assert_eq!(unwrap_payload(&json!({"content": "plain text"})), "plain text");
        assert_eq!(
            unwrap_payload(&json!({"content": [{"type": "text", "text": "a"}, {"type": "text", "text": "b"}]})),
            "a\nb"
        );
        assert_eq!(unwrap_payload(&json!({"data": "from data"})), "from data");
        // content wins over data
        assert_eq!(
            unwrap_payload(&json!({"content": "c", "data": "d"})),
            "c"
        );
        assert_eq!(unwrap_payload(&json!(42)), "42");
        assert_eq!(unwrap_payload(&json!({"other": 1})), r#"{"other":1}"#);
    }

    #[test]
    fn test_followup_message_shape() {
        let results = vec![
            ToolResult::success("lookup", json!({}), "short output"),
            ToolResult::failure("save", json!({}), "disk full"),
        ];
        let message = build_followup_message(&results);

        assert!(message.contains("Tool execution completed. Results:"));
        assert!(message.contains("1. lookup: ✅ Success"));
        assert!(message.contains("   Result: short output"));
        assert!(message.contains("2. save: ❌ Failed"));
        assert!(message.contains("   Error: disk full"));
        // Short outputs are not truncated
        assert!(!message.contains("(truncated)"));
    }
}
