//! Agentry Core
//!
//! Runtime-agnostic brokering between a language-model backend and a
//! dynamic set of MCP tool servers. This crate provides the core
//! functionality a thin API layer (HTTP, WebSocket, CLI) builds on:
//!
//! - `mcp`: the connection registry: establishes, health-checks and
//!   recovers tool-server connections over stdio or streamable HTTP
//! - `tools`: flattens per-server catalogs into one normalized,
//!   LLM-compatible tool set
//! - `agent`: bounded conversations and the orchestration engine driving
//!   one message turn (chat, tool round, follow-up) at a time
//! - `providers`: the chat backend boundary (genai-backed, plus a mock)
//!
//! ## Wiring
//!
//! Every component is an explicit struct constructed once at process start;
//! there is no ambient global state.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use agentry_core::logging::ConsoleLogger;
//! use agentry_core::mcp::{ConnectionManager, McpConnector, DEFAULT_HEALTH_INTERVAL};
//! use agentry_core::tools::ToolRegistry;
//! use agentry_core::providers::GenaiChatClient;
//! use agentry_core::agent::{
//!     AgentConfig, AgentEngine, ConversationReaper, ConversationStore, DEFAULT_REAP_INTERVAL,
//! };
//! use agentry_core::types::ServerConfig;
//!
//! let logger = Arc::new(ConsoleLogger::new());
//!
//! let connector = Arc::new(McpConnector::new(logger.clone()));
//! let manager = Arc::new(ConnectionManager::new(connector, logger.clone()));
//! manager.add_server(ServerConfig::stdio("fs", "Filesystem", "mcp-server-fs")).await;
//! manager.clone().start_health_monitor(DEFAULT_HEALTH_INTERVAL);
//!
//! let registry = Arc::new(ToolRegistry::new(manager.clone(), logger.clone()));
//! registry.refresh();
//!
//! let chat = Arc::new(GenaiChatClient::new(logger.clone()));
//! let engine = Arc::new(AgentEngine::new(
//!     Arc::new(ConversationStore::new()),
//!     registry,
//!     manager.clone(),
//!     chat,
//!     AgentConfig::default(),
//!     logger.clone(),
//! ));
//!
//! let reaper = Arc::new(ConversationReaper::new(engine.clone(), logger.clone()));
//! reaper.clone().start(DEFAULT_REAP_INTERVAL);
//!
//! let conversation = engine.create_conversation(None, None, None).await?;
//! let outcome = engine.send_message(&conversation.conversation_id, "list /data").await?;
//!
//! // At shutdown
//! reaper.stop().await;
//! manager.cleanup().await;
//! ```

pub mod agent;
pub mod logging;
pub mod mcp;
pub mod providers;
pub mod tools;
pub mod types;

// Re-export commonly used types
pub use types::{
    CancellationToken, ChatMessage, MessageRole, ModelCapabilities, ServerConfig, ServerStatus,
    ServerStatusReport, Tool, ToolCall, ToolResult, TransportKind,
};

pub use logging::{ConsoleLogger, Logger, NoOpLogger};

pub use mcp::{
    ConnectionManager, Connector, McpClient, McpConnector, McpError, McpResult, RawTool,
    ServerConnection, ToolCallError, ToolTransport, DEFAULT_HEALTH_INTERVAL,
};

pub use tools::{normalize_schema, ToolDescriptor, ToolRegistry};

pub use providers::{
    ChatClient, ChatError, ChatReply, ChatResult, GenaiChatClient, MockChatClient,
};

pub use agent::{
    AgentConfig, AgentEngine, AgentError, AgentResult, AgentStatus, Conversation,
    ConversationReaper, ConversationStore, ConversationSummary, ToolInventory, TurnOutcome,
    DEFAULT_REAP_INTERVAL,
};
