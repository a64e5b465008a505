//! A single tool-server connection and its lifecycle

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

use super::transport::{Connector, RawTool, ToolTransport};
use crate::logging::Logger;
use crate::types::{ServerConfig, ServerStatus, ServerStatusReport, TransportKind};

/// Why a tool call did not produce a payload
///
/// These are captured as data by callers (a failed `ToolResult`), never
/// propagated as panics or turn-level errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolCallError {
    #[error("server {0} not found")]
    ServerNotFound(String),

    #[error("server {0} is not connected")]
    NotConnected(String),

    #[error("tool {tool} not available on server {server}")]
    ToolNotFound { tool: String, server: String },

    #[error("tool call timed out after {0} seconds")]
    Timeout(u64),

    #[error("{0}")]
    Transport(String),
}

struct ConnectionState {
    status: ServerStatus,
    last_error: Option<String>,
    tools: Vec<RawTool>,
}

/// One tool server: its transport session, status, and tool catalog
///
/// Status transitions (`connect`, `disconnect`, `health_check`) are
/// serialized by a per-connection mutex; concurrent callers block rather
/// than interleave. Tool dispatch deliberately does not take that mutex, so
/// a call racing a disconnect observes `NotConnected` instead of blocking.
pub struct ServerConnection {
    config: ServerConfig,
    connector: Arc<dyn Connector>,
    transport: RwLock<Option<Arc<dyn ToolTransport>>>,
    state: RwLock<ConnectionState>,
    transition: Mutex<()>,
    logger: Arc<dyn Logger>,
}

impl ServerConnection {
    /// Create a connection in the Disconnected state
    pub fn new(config: ServerConfig, connector: Arc<dyn Connector>, logger: Arc<dyn Logger>) -> Self {
        Self {
            config,
            connector,
            transport: RwLock::new(None),
            state: RwLock::new(ConnectionState {
                status: ServerStatus::Disconnected,
                last_error: None,
                tools: Vec::new(),
            }),
            transition: Mutex::new(()),
            logger,
        }
    }

    /// The server's configuration record
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Current connection status
    pub fn status(&self) -> ServerStatus {
        self.state.read().status
    }

    /// Error message from the most recent failure, if any
    pub fn last_error(&self) -> Option<String> {
        self.state.read().last_error.clone()
    }

    /// Snapshot of the current tool catalog
    pub fn tools(&self) -> Vec<RawTool> {
        self.state.read().tools.clone()
    }

    /// Point-in-time status report
    pub fn status_report(&self) -> ServerStatusReport {
        let state = self.state.read();
        ServerStatusReport {
            id: self.config.id.clone(),
            name: self.config.name.clone(),
            status: state.status,
            last_error: state.last_error.clone(),
            tool_count: state.tools.len(),
            enabled: self.config.enabled,
        }
    }

    /// Connect to the server
    ///
    /// On success the tool catalog is enumerated best-effort: an enumeration
    /// failure leaves an empty catalog with a warning, it does not fail the
    /// connect. Failures are recorded in the status/last_error pair; this
    /// method never propagates them.
    pub async fn connect(&self) -> bool {
        let _guard = self.transition.lock().await;

        self.state.write().status = ServerStatus::Connecting;
        self.logger.info(&format!(
            "[ServerConnection] Connecting to server: {}",
            self.config.name
        ));

        // A reconnect after a health-check failure may still hold the dead
        // transport; tear it down before building a fresh one.
        let stale = self.transport.write().take();
        if let Some(stale) = stale {
            if let Err(e) = stale.close().await {
                self.logger.debug(&format!(
                    "[ServerConnection] Error closing stale transport for {}: {}",
                    self.config.name, e
                ));
            }
        }

        match self.connector.connect(&self.config).await {
            Ok(transport) => {
                let tools = match transport.list_tools().await {
                    Ok(tools) => {
                        self.logger.info(&format!(
                            "[ServerConnection] Found {} tools on {}: {:?}",
                            tools.len(),
                            self.config.name,
                            tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>()
                        ));
                        tools
                    }
                    Err(e) => {
                        self.logger.warn(&format!(
                            "[ServerConnection] Could not list tools from {}: {}",
                            self.config.name, e
                        ));
                        Vec::new()
                    }
                };

                *self.transport.write() = Some(transport);
                let mut state = self.state.write();
                state.status = ServerStatus::Connected;
                state.last_error = None;
                state.tools = tools;

                self.logger.info(&format!(
                    "[ServerConnection] Successfully connected to server: {}",
                    self.config.name
                ));
                true
            }
            Err(e) => {
                let mut state = self.state.write();
                state.status = ServerStatus::Error;
                state.last_error = Some(e.to_string());
                state.tools = Vec::new();

                self.logger.error(&format!(
                    "[ServerConnection] Failed to connect to server {}: {}",
                    self.config.name, e
                ));
                false
            }
        }
    }

    /// Disconnect from the server
    ///
    /// Transport teardown is best-effort; the connection always ends up
    /// Disconnected with an empty catalog.
    pub async fn disconnect(&self) {
        let _guard = self.transition.lock().await;

        let transport = self.transport.write().take();
        if let Some(transport) = transport {
            if let Err(e) = transport.close().await {
                self.logger.error(&format!(
                    "[ServerConnection] Error disconnecting from {}: {}",
                    self.config.name, e
                ));
            }
        }

        let mut state = self.state.write();
        state.status = ServerStatus::Disconnected;
        state.tools = Vec::new();
        drop(state);

        self.logger.info(&format!(
            "[ServerConnection] Disconnected from server: {}",
            self.config.name
        ));
    }

    /// Execute a tool on this server
    ///
    /// Fails fast when the connection is not usable or the tool is not in
    /// the catalog; otherwise invokes the transport bounded by the
    /// configured per-call timeout. All failure modes come back as
    /// `ToolCallError` values.
    pub async fn execute_tool(&self, name: &str, arguments: Value) -> Result<Value, ToolCallError> {
        let transport = {
            let state = self.state.read();
            if state.status != ServerStatus::Connected {
                return Err(ToolCallError::NotConnected(self.config.name.clone()));
            }
            if !state.tools.iter().any(|tool| tool.name == name) {
                return Err(ToolCallError::ToolNotFound {
                    tool: name.to_string(),
                    server: self.config.name.clone(),
                });
            }
            match self.transport.read().clone() {
                Some(transport) => transport,
                None => return Err(ToolCallError::NotConnected(self.config.name.clone())),
            }
        };

        self.logger.info(&format!(
            "[ServerConnection] Executing tool {} on server {}",
            name, self.config.name
        ));

        match tokio::time::timeout(self.config.timeout(), transport.call_tool(name, arguments))
            .await
        {
            Ok(Ok(value)) => {
                self.logger.info(&format!(
                    "[ServerConnection] Tool {} executed successfully on {}",
                    name, self.config.name
                ));
                Ok(value)
            }
            Ok(Err(e)) => {
                self.logger.error(&format!(
                    "[ServerConnection] Tool execution failed on {}: {}",
                    self.config.name, e
                ));
                Err(ToolCallError::Transport(e.to_string()))
            }
            Err(_) => {
                self.logger.error(&format!(
                    "[ServerConnection] Tool {} timed out on {} after {}s",
                    name, self.config.name, self.config.timeout_secs
                ));
                Err(ToolCallError::Timeout(self.config.timeout_secs))
            }
        }
    }

    /// Probe whether the connection is still healthy
    ///
    /// Stdio transports are probed by re-enumerating tools. Http transports
    /// have no generic probe and report healthy. Only meaningful when
    /// Connected; a failed probe transitions to Error and returns false,
    /// leaving reconnection to the caller.
    pub async fn health_check(&self) -> bool {
        let _guard = self.transition.lock().await;

        if self.state.read().status != ServerStatus::Connected {
            return false;
        }

        match self.config.transport {
            TransportKind::Http => true,
            TransportKind::Stdio => {
                let transport = match self.transport.read().clone() {
                    Some(transport) => transport,
                    None => return false,
                };

                match transport.list_tools().await {
                    Ok(_) => true,
                    Err(e) => {
                        self.logger.warn(&format!(
                            "[ServerConnection] Health check failed for {}: {}",
                            self.config.name, e
                        ));
                        let mut state = self.state.write();
                        state.status = ServerStatus::Error;
                        state.last_error = Some(e.to_string());
                        false
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::mcp::testing::{MockConnector, MockTransport};
    use serde_json::json;
    use std::time::Instant;

    fn test_logger() -> Arc<dyn Logger> {
        Arc::new(NoOpLogger::new())
    }

    fn sample_tools() -> Vec<RawTool> {
        vec![
            RawTool::new("echo", "Echo the input", json!({"type": "object"})),
            RawTool::new("add", "Add numbers", json!({"type": "object"})),
        ]
    }

    #[tokio::test]
    async fn test_connect_success_populates_catalog() {
        let transport = Arc::new(MockTransport::new(sample_tools()));
        let connector = Arc::new(MockConnector::with_transports(vec![transport]));
        let conn = ServerConnection::new(
            ServerConfig::stdio("s1", "One", "tool-server"),
            connector,
            test_logger(),
        );

        assert_eq!(conn.status(), ServerStatus::Disconnected);
        assert!(conn.connect().await);
        assert_eq!(conn.status(), ServerStatus::Connected);
        assert_eq!(conn.tools().len(), 2);
        assert!(conn.last_error().is_none());
    }

    #[tokio::test]
    async fn test_connect_failure_records_error() {
        let connector = Arc::new(MockConnector::failing("spawn failed: no such file"));
        let conn = ServerConnection::new(
            ServerConfig::stdio("s1", "One", "nonexistent-command"),
            connector,
            test_logger(),
        );

        assert!(!conn.connect().await);
        assert_eq!(conn.status(), ServerStatus::Error);
        assert!(conn.last_error().unwrap().contains("spawn failed"));
        assert!(conn.tools().is_empty());
    }

    #[tokio::test]
    async fn test_list_failure_on_connect_is_best_effort() {
        let transport = Arc::new(MockTransport::new(sample_tools()).fail_list_from(0));
        let connector = Arc::new(MockConnector::with_transports(vec![transport]));
        let conn = ServerConnection::new(
            ServerConfig::stdio("s1", "One", "tool-server"),
            connector,
            test_logger(),
        );

        // Enumeration failed but the connect itself succeeded
        assert!(conn.connect().await);
        assert_eq!(conn.status(), ServerStatus::Connected);
        assert!(conn.tools().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_clears_catalog_and_closes_transport() {
        let transport = Arc::new(MockTransport::new(sample_tools()));
        let connector = Arc::new(MockConnector::with_transports(vec![transport.clone()]));
        let conn = ServerConnection::new(
            ServerConfig::stdio("s1", "One", "tool-server"),
            connector,
            test_logger(),
        );

        conn.connect().await;
        conn.disconnect().await;

        assert_eq!(conn.status(), ServerStatus::Disconnected);
        assert!(conn.tools().is_empty());
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn test_status_walk_through_reconnect() {
        // connect ok, health-check failure, reconnect ok
        let first = Arc::new(MockTransport::new(sample_tools()).fail_list_from(1));
        let second = Arc::new(MockTransport::new(sample_tools()));
        let connector = Arc::new(MockConnector::with_transports(vec![first, second]));
        let conn = ServerConnection::new(
            ServerConfig::stdio("s1", "One", "tool-server"),
            connector,
            test_logger(),
        );

        assert!(conn.connect().await);
        assert_eq!(conn.status(), ServerStatus::Connected);

        assert!(!conn.health_check().await);
        assert_eq!(conn.status(), ServerStatus::Error);
        assert!(conn.last_error().is_some());

        // Reconnect is a fresh connect from Error
        assert!(conn.connect().await);
        assert_eq!(conn.status(), ServerStatus::Connected);
        assert!(conn.last_error().is_none());
    }

    #[tokio::test]
    async fn test_execute_tool_not_connected() {
        let connector = Arc::new(MockConnector::with_transports(vec![]));
        let conn = ServerConnection::new(
            ServerConfig::stdio("s1", "One", "tool-server"),
            connector,
            test_logger(),
        );

        let err = conn.execute_tool("echo", json!({})).await.unwrap_err();
        assert_eq!(err, ToolCallError::NotConnected("One".to_string()));
    }

    #[tokio::test]
    async fn test_execute_tool_unknown_tool() {
        let transport = Arc::new(MockTransport::new(sample_tools()));
        let connector = Arc::new(MockConnector::with_transports(vec![transport]));
        let conn = ServerConnection::new(
            ServerConfig::stdio("s1", "One", "tool-server"),
            connector,
            test_logger(),
        );

        conn.connect().await;
        let err = conn.execute_tool("bogus", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolCallError::ToolNotFound { .. }));
    }

    #[tokio::test]
    async fn test_execute_tool_returns_payload() {
        let transport = Arc::new(
            MockTransport::new(sample_tools())
                .with_response("echo", json!({"content": "hello back"})),
        );
        let connector = Arc::new(MockConnector::with_transports(vec![transport]));
        let conn = ServerConnection::new(
            ServerConfig::stdio("s1", "One", "tool-server"),
            connector,
            test_logger(),
        );

        conn.connect().await;
        let value = conn.execute_tool("echo", json!({"text": "hi"})).await.unwrap();
        assert_eq!(value["content"], "hello back");
    }

    #[tokio::test]
    async fn test_execute_tool_timeout_is_bounded() {
        let transport =
            Arc::new(MockTransport::new(sample_tools()).with_call_delay_ms("echo", 5_000));
        let connector = Arc::new(MockConnector::with_transports(vec![transport]));
        let conn = ServerConnection::new(
            ServerConfig::stdio("s1", "One", "tool-server").with_timeout_secs(1),
            connector,
            test_logger(),
        );

        conn.connect().await;
        let started = Instant::now();
        let err = conn.execute_tool("echo", json!({})).await.unwrap_err();
        let elapsed = started.elapsed();

        assert_eq!(err, ToolCallError::Timeout(1));
        assert!(elapsed.as_millis() >= 900, "timeout fired early: {:?}", elapsed);
        assert!(elapsed.as_millis() < 2_000, "timeout took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_http_health_check_defaults_healthy() {
        let transport = Arc::new(MockTransport::new(sample_tools()).fail_list_from(1));
        let connector = Arc::new(MockConnector::with_transports(vec![transport]));
        let conn = ServerConnection::new(
            ServerConfig::http("s1", "One", "http://localhost:9000/mcp"),
            connector,
            test_logger(),
        );

        conn.connect().await;
        // The probe would fail, but http connections have no generic probe
        assert!(conn.health_check().await);
        assert_eq!(conn.status(), ServerStatus::Connected);
    }

    #[tokio::test]
    async fn test_health_check_when_not_connected() {
        let connector = Arc::new(MockConnector::with_transports(vec![]));
        let conn = ServerConnection::new(
            ServerConfig::stdio("s1", "One", "tool-server"),
            connector,
            test_logger(),
        );

        assert!(!conn.health_check().await);
        assert_eq!(conn.status(), ServerStatus::Disconnected);
    }
}
