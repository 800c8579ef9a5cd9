//! Gateway error types.

use crate::config::ConfigError;
use crate::modules::control::ControlError;
use crate::modules::coordination::CoordinationError;
use crate::modules::failover::ElectionError;
use thiserror::Error;

/// Errors that stop the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Coordination store could not be set up.
    #[error(transparent)]
    Coordination(#[from] CoordinationError),

    /// Election ended without this instance serving.
    #[error(transparent)]
    Election(#[from] ElectionError),

    /// Control endpoint failed.
    #[error(transparent)]
    Control(#[from] ControlError),
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
