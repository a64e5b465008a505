//! Model capability types

use serde::{Deserialize, Serialize};

/// Fixed capability record for a model
///
/// The engine only consults this record; it performs no capability
/// detection of its own.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ModelCapabilities {
    /// Whether the model supports image input
    #[serde(default)]
    pub image_input: bool,
    /// Whether the model supports tool/function calling
    #[serde(default)]
    pub tool_calling: bool,
    /// Whether the model supports streaming
    #[serde(default)]
    pub streaming: bool,
}

impl ModelCapabilities {
    /// Create capabilities with all features enabled
    pub fn full() -> Self {
        Self {
            image_input: true,
            tool_calling: true,
            streaming: true,
        }
    }

    /// Create capabilities for a tool-calling text model
    pub fn tools_only() -> Self {
        Self {
            tool_calling: true,
            ..Default::default()
        }
    }
}
