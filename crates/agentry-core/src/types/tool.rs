//! Tool/function calling types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool definition for function calling
///
/// This is the LLM-facing shape: the schema here has already been normalized
/// by the tool registry and is safe to hand to a function-calling backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name (function name)
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON Schema for the input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl Tool {
    /// Create a new tool definition with an empty object schema
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: Value::Object(Default::default()),
        }
    }

    /// Set the input schema
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }
}

/// Tool call requested by the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation id for this call
    pub id: String,
    /// Name of the tool being called
    pub name: String,
    /// Argument map for the tool
    pub arguments: Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Get an argument by key
    pub fn get_arg(&self, key: &str) -> Option<&Value> {
        self.arguments.get(key)
    }

    /// Get an argument as a string
    pub fn get_arg_str(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }
}

/// Outcome of one executed (or rejected) tool call, display-ready
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Name of the tool that was called
    pub tool: String,
    /// The arguments that were passed, echoed back
    pub arguments: Value,
    /// Unwrapped, display-ready result text
    pub output: String,
    /// Whether the call succeeded
    pub success: bool,
    /// Error text for failed calls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock execution time in milliseconds
    #[serde(rename = "durationMs", default)]
    pub duration_ms: u64,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(tool: impl Into<String>, arguments: Value, output: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            arguments,
            output: output.into(),
            success: true,
            error: None,
            duration_ms: 0,
        }
    }

    /// Create a failed tool result
    pub fn failure(tool: impl Into<String>, arguments: Value, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            tool: tool.into(),
            arguments,
            output: format!("Error: {}", error),
            success: false,
            error: Some(error),
            duration_ms: 0,
        }
    }

    /// Set the execution duration
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}
