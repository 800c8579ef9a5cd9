//! Load balancer error types.

use thiserror::Error;

/// Errors that can occur in the load balancer module.
#[derive(Debug, Error)]
pub enum LoadBalancerError {
    /// Every backend in the directory failed its health probe.
    #[error("no healthy backend available ({0} probed)")]
    NoHealthyBackend(usize),

    /// The directory has no entries at all.
    #[error("backend directory is empty")]
    EmptyDirectory,

    /// Requester coordinates are missing or malformed.
    #[error("invalid request location: {0}")]
    InvalidRequestLocation(String),

    /// A backend address could not be parsed.
    #[error("invalid backend address '{address}': {reason}")]
    InvalidBackendAddress {
        /// Address as configured.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Forwarding to the selected backend failed.
    #[error("forwarding to {backend} failed: {reason}")]
    ForwardFailed {
        /// Backend address.
        backend: String,
        /// Underlying failure.
        reason: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl LoadBalancerError {
    /// Whether the error was caused by the client's request rather than
    /// by the balancer or its backends.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequestLocation(_))
    }
}

/// Result type for load balancer operations.
pub type LoadBalancerResult<T> = Result<T, LoadBalancerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LoadBalancerError::NoHealthyBackend(3);
        assert_eq!(err.to_string(), "no healthy backend available (3 probed)");

        let err = LoadBalancerError::InvalidRequestLocation("missing header 'Latitude'".into());
        assert_eq!(
            err.to_string(),
            "invalid request location: missing header 'Latitude'"
        );
    }

    #[test]
    fn test_client_error_classification() {
        assert!(LoadBalancerError::InvalidRequestLocation("x".into()).is_client_error());
        assert!(!LoadBalancerError::NoHealthyBackend(1).is_client_error());
        assert!(!LoadBalancerError::EmptyDirectory.is_client_error());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: LoadBalancerError = io_err.into();
        assert!(matches!(err, LoadBalancerError::IoError(_)));
    }
}
