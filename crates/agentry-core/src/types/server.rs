//! Tool-server configuration and status types

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How a tool server is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Subprocess speaking the protocol over stdin/stdout
    Stdio,
    /// Remote server speaking the protocol over streamable HTTP
    Http,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Stdio => write!(f, "stdio"),
            TransportKind::Http => write!(f, "http"),
        }
    }
}

/// Connection status of a tool server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerStatus::Disconnected => write!(f, "disconnected"),
            ServerStatus::Connecting => write!(f, "connecting"),
            ServerStatus::Connected => write!(f, "connected"),
            ServerStatus::Error => write!(f, "error"),
        }
    }
}

/// Validated configuration record for one tool server
///
/// Records are produced and persisted elsewhere; by the time one reaches the
/// connection registry it is assumed valid for its transport kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Stable, caller-assigned server id
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Transport kind (stdio or http)
    pub transport: TransportKind,
    /// Command to spawn for stdio servers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Arguments for the stdio command
    #[serde(default)]
    pub args: Vec<String>,
    /// URL for http servers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Extra headers for http servers
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Whether the server should be connected at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_enabled() -> bool {
    true
}

impl ServerConfig {
    /// Create a stdio server config
    pub fn stdio(
        id: impl Into<String>,
        name: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            transport: TransportKind::Stdio,
            command: Some(command.into()),
            args: Vec::new(),
            url: None,
            headers: HashMap::new(),
            timeout_secs: default_timeout_secs(),
            enabled: true,
        }
    }

    /// Create an http server config
    pub fn http(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            transport: TransportKind::Http,
            command: None,
            args: Vec::new(),
            url: Some(url.into()),
            headers: HashMap::new(),
            timeout_secs: default_timeout_secs(),
            enabled: true,
        }
    }

    /// Set the command arguments
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the per-call timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Register the server without connecting it
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Per-call timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Point-in-time status of one registered server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatusReport {
    /// Server id
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Current connection status
    pub status: ServerStatus,
    /// Error message from the most recent failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Number of tools in the current catalog
    pub tool_count: usize,
    /// Whether the server is enabled
    pub enabled: bool,
}
