//! Error types for loghub client operations.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The background connection task has already stopped; no further
    /// submissions or reconnect attempts will happen.
    #[error("connection task closed")]
    Closed,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
