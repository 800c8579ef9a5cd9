//! Election error types.

use std::io;
use thiserror::Error;

/// Errors that end the election loop.
#[derive(Debug, Error)]
pub enum ElectionError {
    /// Shutdown was requested before a role was chosen.
    #[error("election cancelled")]
    Cancelled,

    /// The public listener could not be bound for a reason other than the
    /// address being in use.
    #[error("failed to bind listener on {address}: {source}")]
    ListenerBind {
        /// Listen address.
        address: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// Result type for election operations.
pub type ElectionResult<T> = Result<T, ElectionError>;
