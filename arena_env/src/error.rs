//! Error types for the arena environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The collaborator refused the request (no runtime, shutting down, ...)
    #[error("Request rejected: {0}")]
    RequestRejected(String),

    /// Context operation failed
    #[error("Context error: {0}")]
    ContextError(String),
}

impl EnvError {
    /// Creates a rejected-request error.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::RequestRejected(msg.into())
    }
}
