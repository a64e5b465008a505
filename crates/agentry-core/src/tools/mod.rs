//! Tool discovery and normalization
//!
//! The registry flattens every connected server's catalog into one
//! addressable table. Each entry is tagged with its owning server and a
//! globally unique `{server_id}_{name}` key, and its schema is normalized
//! into the shape function-calling backends accept.

mod registry;

pub use registry::{normalize_schema, ToolDescriptor, ToolRegistry};
