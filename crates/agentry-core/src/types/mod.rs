//! Core data types shared across modules

mod cancellation;
mod message;
mod model;
mod server;
mod tool;

pub use cancellation::CancellationToken;
pub use message::{ChatMessage, MessageRole};
pub use model::ModelCapabilities;
pub use server::{ServerConfig, ServerStatus, ServerStatusReport, TransportKind};
pub use tool::{Tool, ToolCall, ToolResult};
