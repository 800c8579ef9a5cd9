//! Coordination error types.

use thiserror::Error;

/// Errors returned by the coordination store and lock.
#[derive(Debug, Clone, Error)]
pub enum CoordinationError {
    /// Another instance holds the lock. Expected during contention.
    #[error("lock '{key}' is held by another instance")]
    LockHeld {
        /// Lock key.
        key: String,
    },

    /// The store could not be reached.
    #[error("coordination store unreachable: {0}")]
    Connectivity(String),

    /// The lease does not exist (expired or revoked).
    #[error("lease {0} not found")]
    LeaseNotFound(i64),

    /// The store rejected the operation.
    #[error("coordination store error: {0}")]
    Store(String),
}

impl CoordinationError {
    /// Whether the error is a contention outcome rather than a failure.
    #[must_use]
    pub fn is_lock_held(&self) -> bool {
        matches!(self, Self::LockHeld { .. })
    }
}

/// Result type for coordination operations.
pub type CoordinationResult<T> = Result<T, CoordinationError>;
