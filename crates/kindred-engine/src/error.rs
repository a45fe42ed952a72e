//! Error types for engine operations

use kindred_domain::{CommitConflict, RequestStateError, UnsupportedRelation};
use thiserror::Error;

/// Errors that can occur during engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// A referenced person, cluster or request does not exist
    #[error("{kind} not found: {key}")]
    NotFound {
        /// Kind of record looked up
        kind: &'static str,
        /// Id or handle used for the lookup
        key: String,
    },

    /// The operation collides with existing state (duplicate handle, same
    /// family, equivalent pending request, person still referenced)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A request transition that its current state does not allow
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Relation type or sex outside the supported set
    #[error("Unsupported relation: {0}")]
    UnsupportedRelation(#[from] UnsupportedRelation),

    /// The change set was refused by the store; nothing was written
    #[error("Transaction failed: {0}")]
    TransactionFailure(CommitConflict),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub(crate) fn not_found(kind: &'static str, key: impl ToString) -> Self {
        EngineError::NotFound {
            kind,
            key: key.to_string(),
        }
    }
}

impl From<RequestStateError> for EngineError {
    fn from(err: RequestStateError) -> Self {
        EngineError::InvalidState(err.to_string())
    }
}
