//! Tool-server connectivity
//!
//! The connection registry (`ConnectionManager`) owns one `ServerConnection`
//! per configured tool server. Each connection owns its transport session
//! and tool catalog and walks the status machine
//! Disconnected -> Connecting -> Connected / Error.
//!
//! Production transports go through the official rmcp SDK (`McpClient`,
//! `McpConnector`): stdio servers are spawned as child processes, http
//! servers are reached over streamable HTTP. Everything above the
//! `ToolTransport` seam is SDK-agnostic.
//!
//! # Example
//!
//! ```rust,ignore
//! use agentry_core::mcp::{ConnectionManager, McpConnector, DEFAULT_HEALTH_INTERVAL};
//! use agentry_core::types::ServerConfig;
//! use std::sync::Arc;
//!
//! let connector = Arc::new(McpConnector::new(logger.clone()));
//! let manager = Arc::new(ConnectionManager::new(connector, logger));
//!
//! manager.add_server(
//!     ServerConfig::stdio("fs", "Filesystem", "mcp-server-fs")
//!         .with_args(["--root", "/data"]),
//! ).await;
//!
//! manager.clone().start_health_monitor(DEFAULT_HEALTH_INTERVAL);
//! ```

mod client;
mod connection;
mod manager;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{McpClient, McpConnector, McpError, McpResult};
pub use connection::{ServerConnection, ToolCallError};
pub use manager::{ConnectionManager, DEFAULT_HEALTH_INTERVAL};
pub use transport::{Connector, RawTool, ToolTransport};
