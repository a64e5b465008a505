//! Scripted transports and connectors for tests

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::client::{McpError, McpResult};
use super::transport::{Connector, RawTool, ToolTransport};
use crate::types::ServerConfig;

/// A transport whose behavior is scripted up front
pub(crate) struct MockTransport {
    tools: Vec<RawTool>,
    list_calls: AtomicUsize,
    fail_list_from: Option<usize>,
    responses: HashMap<String, Value>,
    call_delays_ms: HashMap<String, u64>,
    call_errors: HashMap<String, String>,
    closed: AtomicBool,
}

impl MockTransport {
    pub(crate) fn new(tools: Vec<RawTool>) -> Self {
        Self {
            tools,
            list_calls: AtomicUsize::new(0),
            fail_list_from: None,
            responses: HashMap::new(),
            call_delays_ms: HashMap::new(),
            call_errors: HashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Fail `list_tools` from the n-th call onward (0-based)
    ///
    /// `fail_list_from(0)` fails the enumeration during connect;
    /// `fail_list_from(1)` lets the connect succeed and fails the next
    /// health probe.
    pub(crate) fn fail_list_from(mut self, call_index: usize) -> Self {
        self.fail_list_from = Some(call_index);
        self
    }

    /// Script the payload returned for a tool
    pub(crate) fn with_response(mut self, tool: impl Into<String>, payload: Value) -> Self {
        self.responses.insert(tool.into(), payload);
        self
    }

    /// Delay a tool's response, for timeout tests
    pub(crate) fn with_call_delay_ms(mut self, tool: impl Into<String>, delay_ms: u64) -> Self {
        self.call_delays_ms.insert(tool.into(), delay_ms);
        self
    }

    /// Script a transport failure for a tool
    pub(crate) fn with_call_error(mut self, tool: impl Into<String>, error: impl Into<String>) -> Self {
        self.call_errors.insert(tool.into(), error.into());
        self
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolTransport for MockTransport {
    async fn list_tools(&self) -> McpResult<Vec<RawTool>> {
        let index = self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(from) = self.fail_list_from {
            if index >= from {
                return Err(McpError::Protocol("listTools failed".to_string()));
            }
        }
        Ok(self.tools.clone())
    }

    async fn call_tool(&self, name: &str, _arguments: Value) -> McpResult<Value> {
        if let Some(delay) = self.call_delays_ms.get(name) {
            tokio::time::sleep(std::time::Duration::from_millis(*delay)).await;
        }
        if let Some(error) = self.call_errors.get(name) {
            return Err(McpError::ToolCallFailed(error.clone()));
        }
        Ok(self
            .responses
            .get(name)
            .cloned()
            .unwrap_or_else(|| json!({"content": "ok"})))
    }

    async fn close(&self) -> McpResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A connector that hands out pre-built transports, or always fails
pub(crate) struct MockConnector {
    transports: Mutex<VecDeque<Arc<MockTransport>>>,
    failure: Option<String>,
    connect_calls: AtomicUsize,
}

impl MockConnector {
    /// Hand out the given transports, one per connect call
    pub(crate) fn with_transports(transports: Vec<Arc<MockTransport>>) -> Self {
        Self {
            transports: Mutex::new(transports.into()),
            failure: None,
            connect_calls: AtomicUsize::new(0),
        }
    }

    /// Fail every connect attempt with the given message
    pub(crate) fn failing(message: impl Into<String>) -> Self {
        Self {
            transports: Mutex::new(VecDeque::new()),
            failure: Some(message.into()),
            connect_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _config: &ServerConfig) -> McpResult<Arc<dyn ToolTransport>> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(McpError::ConnectionFailed(message.clone()));
        }
        match self.transports.lock().pop_front() {
            Some(transport) => Ok(transport),
            None => Err(McpError::ConnectionFailed(
                "no transport scripted".to_string(),
            )),
        }
    }
}
