//! Control endpoint error types.

use std::fmt;
use std::io;

/// Result type for control endpoint operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur in the control endpoint.
#[derive(Debug)]
pub enum ControlError {
    /// Server bind error.
    BindError(String),
    /// Server not running.
    NotRunning,
    /// Server already running.
    AlreadyRunning,
    /// I/O error.
    IoError(io::Error),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BindError(msg) => write!(f, "Failed to bind control endpoint: {msg}"),
            Self::NotRunning => write!(f, "Control endpoint is not running"),
            Self::AlreadyRunning => write!(f, "Control endpoint is already running"),
            Self::IoError(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for ControlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ControlError {
    fn from(err: io::Error) -> Self {
        Self::IoError(err)
    }
}
