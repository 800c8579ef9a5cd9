//! Configuration error types.

use crate::modules::load_balancer::LoadBalancerError;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read configuration file '{path}': {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML content.
    #[error("failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration validation failed.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),

    /// The advertised address cannot be probed.
    #[error("invalid advertise address '{address}': {reason}")]
    InvalidAdvertiseAddress {
        /// Address as resolved.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A backend entry cannot be turned into a backend.
    #[error(transparent)]
    InvalidBackend(#[from] LoadBalancerError),

    /// Failed to write configuration file.
    #[error("failed to write configuration file '{path}': {source}")]
    WriteError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
