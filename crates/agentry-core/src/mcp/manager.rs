//! Registry of tool-server connections

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex as SyncMutex, RwLock};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::connection::{ServerConnection, ToolCallError};
use super::transport::{Connector, RawTool};
use crate::logging::Logger;
use crate::types::{CancellationToken, ServerConfig, ServerStatus, ServerStatusReport};

/// Default health-check interval
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(30);

struct HealthMonitor {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns every tool-server connection and the health-check loop
///
/// Connection lookups and snapshots take a short read lock on the map;
/// `add`/`remove`/`reconnect` are additionally serialized by an admin mutex
/// so replace semantics cannot interleave.
pub struct ConnectionManager {
    connections: RwLock<HashMap<String, Arc<ServerConnection>>>,
    admin: Mutex<()>,
    connector: Arc<dyn Connector>,
    logger: Arc<dyn Logger>,
    monitor: SyncMutex<Option<HealthMonitor>>,
}

impl ConnectionManager {
    /// Create an empty registry
    pub fn new(connector: Arc<dyn Connector>, logger: Arc<dyn Logger>) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            admin: Mutex::new(()),
            connector,
            logger,
            monitor: SyncMutex::new(None),
        }
    }

    /// Add a server and connect it if enabled
    ///
    /// An existing entry with the same id is removed (disconnected, dropped)
    /// first: replace semantics, not merge. Returns the connect outcome, or
    /// true for a disabled server that was only registered.
    pub async fn add_server(&self, config: ServerConfig) -> bool {
        let _admin = self.admin.lock().await;

        let existing = self.connections.write().remove(&config.id);
        if let Some(existing) = existing {
            self.logger.warn(&format!(
                "[ConnectionManager] Server {} already exists, removing first",
                config.id
            ));
            existing.disconnect().await;
        }

        let enabled = config.enabled;
        let id = config.id.clone();
        let name = config.name.clone();
        let connection = Arc::new(ServerConnection::new(
            config,
            self.connector.clone(),
            self.logger.clone(),
        ));
        self.connections.write().insert(id, connection.clone());

        if enabled {
            connection.connect().await
        } else {
            self.logger.info(&format!(
                "[ConnectionManager] Server {} is disabled, not connecting",
                name
            ));
            true
        }
    }

    /// Remove a server, disconnecting it first; no-op if absent
    pub async fn remove_server(&self, server_id: &str) {
        let _admin = self.admin.lock().await;

        let removed = self.connections.write().remove(server_id);
        if let Some(connection) = removed {
            connection.disconnect().await;
            self.logger
                .info(&format!("[ConnectionManager] Removed server {}", server_id));
        }
    }

    /// Disconnect and connect an existing server again
    pub async fn reconnect_server(&self, server_id: &str) -> bool {
        let _admin = self.admin.lock().await;

        let connection = self.connections.read().get(server_id).cloned();
        match connection {
            Some(connection) => {
                connection.disconnect().await;
                connection.connect().await
            }
            None => {
                self.logger.error(&format!(
                    "[ConnectionManager] Server {} not found",
                    server_id
                ));
                false
            }
        }
    }

    /// Execute a tool on a specific server
    pub async fn execute_tool(
        &self,
        server_id: &str,
        tool_name: &str,
        arguments: Value,
    ) -> Result<Value, ToolCallError> {
        let connection = self.connections.read().get(server_id).cloned();
        match connection {
            Some(connection) => connection.execute_tool(tool_name, arguments).await,
            None => Err(ToolCallError::ServerNotFound(server_id.to_string())),
        }
    }

    /// Snapshot of every Connected server's tool catalog, keyed by server id
    ///
    /// Disconnected and errored servers contribute nothing, so downstream
    /// registries only ever see reachable tools.
    pub fn list_all_tools(&self) -> HashMap<String, Vec<RawTool>> {
        let connections = self.connections.read();
        connections
            .iter()
            .filter(|(_, connection)| connection.status() == ServerStatus::Connected)
            .map(|(id, connection)| (id.clone(), connection.tools()))
            .collect()
    }

    /// Status of one server
    pub fn server_status(&self, server_id: &str) -> Option<ServerStatusReport> {
        self.connections
            .read()
            .get(server_id)
            .map(|connection| connection.status_report())
    }

    /// Status of every registered server
    pub fn all_server_status(&self) -> Vec<ServerStatusReport> {
        self.connections
            .read()
            .values()
            .map(|connection| connection.status_report())
            .collect()
    }

    /// Number of registered servers
    pub fn server_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Number of Connected servers
    pub fn connected_count(&self) -> usize {
        self.connections
            .read()
            .values()
            .filter(|connection| connection.status() == ServerStatus::Connected)
            .count()
    }

    /// Start the periodic health-check loop
    ///
    /// One background task checks every enabled, Connected server in turn;
    /// a failed probe is followed by an immediate reconnect attempt before
    /// the loop moves on. Checks run sequentially, so one iteration's
    /// worst-case latency is the sum of the per-connection timeouts. A
    /// second call while the loop is running is a no-op.
    pub fn start_health_monitor(self: Arc<Self>, interval: Duration) {
        let mut monitor = self.monitor.lock();
        if monitor.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let manager = Arc::clone(&self);

        let handle = tokio::spawn(async move {
            loop {
                let snapshot: Vec<Arc<ServerConnection>> =
                    manager.connections.read().values().cloned().collect();

                for connection in snapshot {
                    if token.is_cancelled() {
                        return;
                    }
                    if !connection.config().enabled
                        || connection.status() != ServerStatus::Connected
                    {
                        continue;
                    }

                    if !connection.health_check().await {
                        manager.logger.warn(&format!(
                            "[ConnectionManager] Server {} failed health check, attempting reconnection",
                            connection.config().name
                        ));
                        connection.connect().await;
                    }
                }

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        });

        *monitor = Some(HealthMonitor { cancel, handle });
        self.logger
            .info("[ConnectionManager] Health monitoring started");
    }

    /// Stop the health-check loop and wait for it to finish
    pub async fn stop_health_monitor(&self) {
        let monitor = self.monitor.lock().take();
        if let Some(monitor) = monitor {
            monitor.cancel.cancel();
            let _ = monitor.handle.await;
            self.logger
                .info("[ConnectionManager] Health monitoring stopped");
        }
    }

    /// Stop the health loop, disconnect every server, and clear the registry
    pub async fn cleanup(&self) {
        self.stop_health_monitor().await;

        let connections: Vec<Arc<ServerConnection>> =
            self.connections.write().drain().map(|(_, c)| c).collect();
        for connection in connections {
            connection.disconnect().await;
        }

        self.logger.info("[ConnectionManager] Cleaned up");
    }
}
