//! Tool registry: one addressable, LLM-compatible tool set
//!
//! Flattens the per-server catalogs held by the connection registry into a
//! single table of execution-ready descriptors. The table is rebuilt
//! wholesale on every refresh and swapped atomically, so readers never see
//! a partially-updated set.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::logging::Logger;
use crate::mcp::ConnectionManager;
use crate::types::{ServerStatus, Tool};

/// Normalized, addressable description of one tool on one server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name as the server declared it
    pub name: String,
    /// Tool description
    pub description: String,
    /// Normalized input schema, safe for function-calling backends
    pub input_schema: Value,
    /// Id of the owning server
    pub server_id: String,
    /// Name of the owning server
    pub server_name: String,
    /// Globally unique key, `{server_id}_{name}`
    pub key: String,
}

impl ToolDescriptor {
    /// Derive the globally unique key for a (server, tool) pair
    pub fn key_for(server_id: &str, name: &str) -> String {
        format!("{}_{}", server_id, name)
    }

    /// Project into the LLM-facing tool shape
    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

/// Normalize a declared input schema into a well-formed structural object
///
/// Non-object schemas collapse to an empty object. The `$schema` marker and
/// `additionalProperties` are stripped (function-calling backends reject
/// them), and `properties`/`required` are defaulted so an under-specified
/// tool still yields a valid schema.
pub fn normalize_schema(schema: Value) -> Value {
    let mut map = match schema {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    map.remove("$schema");
    map.remove("additionalProperties");

    if !map.get("properties").map_or(false, Value::is_object) {
        map.insert("properties".to_string(), json!({}));
    }
    if !map.get("required").map_or(false, Value::is_array) {
        map.insert("required".to_string(), json!([]));
    }

    Value::Object(map)
}

/// Registry of every tool reachable through the connection registry
pub struct ToolRegistry {
    /// Connection registry the catalogs are pulled from
    manager: Arc<ConnectionManager>,
    /// Current table; replaced wholesale on refresh
    tools: RwLock<Arc<Vec<ToolDescriptor>>>,
    /// When the table was last rebuilt
    last_refresh: RwLock<Option<DateTime<Utc>>>,
    /// Logger
    logger: Arc<dyn Logger>,
}

impl ToolRegistry {
    /// Create an empty registry over a connection registry
    pub fn new(manager: Arc<ConnectionManager>, logger: Arc<dyn Logger>) -> Self {
        Self {
            manager,
            tools: RwLock::new(Arc::new(Vec::new())),
            last_refresh: RwLock::new(None),
            logger,
        }
    }

    /// Rebuild the table from every Connected server's catalog
    ///
    /// Server ids are walked in sorted order so insertion order, and with it
    /// bare-name collision resolution, is deterministic across refreshes.
    pub fn refresh(&self) {
        let all_tools = self.manager.list_all_tools();

        let mut server_ids: Vec<String> = all_tools.keys().cloned().collect();
        server_ids.sort();

        let mut new_tools = Vec::new();
        for server_id in server_ids {
            let Some(report) = self.manager.server_status(&server_id) else {
                continue;
            };
            if report.status != ServerStatus::Connected {
                continue;
            }

            for raw in &all_tools[&server_id] {
                new_tools.push(ToolDescriptor {
                    name: raw.name.clone(),
                    description: raw.description.clone(),
                    input_schema: normalize_schema(raw.input_schema.clone()),
                    server_id: server_id.clone(),
                    server_name: report.name.clone(),
                    key: ToolDescriptor::key_for(&server_id, &raw.name),
                });
            }
        }

        self.logger.info(&format!(
            "[ToolRegistry] Refreshed {} tools from {}/{} servers",
            new_tools.len(),
            self.manager.connected_count(),
            self.manager.server_count(),
        ));

        *self.tools.write() = Arc::new(new_tools);
        *self.last_refresh.write() = Some(Utc::now());
    }

    /// Snapshot of the current table
    pub fn descriptors(&self) -> Arc<Vec<ToolDescriptor>> {
        self.tools.read().clone()
    }

    /// Find a tool by bare name: first match in insertion order
    pub fn find_by_name(&self, name: &str) -> Option<ToolDescriptor> {
        self.tools
            .read()
            .iter()
            .find(|descriptor| descriptor.name == name)
            .cloned()
    }

    /// Find a tool by its globally unique key
    pub fn find_by_key(&self, key: &str) -> Option<ToolDescriptor> {
        self.tools
            .read()
            .iter()
            .find(|descriptor| descriptor.key == key)
            .cloned()
    }

    /// Project the table into the LLM-facing tool list
    pub fn llm_tools(&self) -> Vec<Tool> {
        self.tools.read().iter().map(ToolDescriptor::to_tool).collect()
    }

    /// Number of tools in the current table
    pub fn tool_count(&self) -> usize {
        self.tools.read().len()
    }

    /// When the table was last rebuilt
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_refresh.read()
    }
}
