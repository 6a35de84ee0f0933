//! Error types for the KKN store.

use thiserror::Error;

/// Result type alias for store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A unique field collides with an existing record.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The record breaks a store invariant.
    #[error("invalid record: {0}")]
    Invalid(String),
}

impl StateError {
    /// Whether the caller can fix the error by changing its input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StateError::NotFound(_) | StateError::Conflict(_) | StateError::Invalid(_)
        )
    }
}
