//! Transport seam between the connection registry and the protocol SDK
//!
//! Everything the rest of the crate knows about a tool server goes through
//! `ToolTransport`. Foreign shapes (SDK tool definitions, call results) are
//! mapped into `RawTool` / `serde_json::Value` here, once, so no business
//! logic ever probes them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::McpResult;
use crate::types::ServerConfig;

/// A tool as reported by a server, before registry normalization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTool {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// Input schema as the server declared it
    pub input_schema: Value,
}

impl RawTool {
    /// Create a raw tool
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// One live session with a tool server
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Enumerate the tools the server offers
    async fn list_tools(&self) -> McpResult<Vec<RawTool>>;

    /// Invoke a tool and return its raw result payload
    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<Value>;

    /// Tear the session down
    async fn close(&self) -> McpResult<()>;
}

/// Builds a live transport session from a server config
///
/// The production implementation is `McpConnector`; tests substitute
/// scripted transports through this seam.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a session with the configured server
    async fn connect(&self, config: &ServerConfig) -> McpResult<std::sync::Arc<dyn ToolTransport>>;
}
