//! Chat backend error types

use thiserror::Error;

/// Errors that can occur talking to the chat backend
///
/// These are the only failures that cross the orchestration boundary as
/// errors: there is no partial result to degrade into when the model
/// itself is unreachable.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Unknown session id
    #[error("session {0} not found")]
    SessionNotFound(String),

    /// The backend rejected or failed the request
    #[error("{provider} backend error: {message}")]
    Backend { provider: String, message: String },

    /// JSON conversion error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ChatError {
    /// Create a backend error
    pub fn backend(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

pub type ChatResult<T> = Result<T, ChatError>;
