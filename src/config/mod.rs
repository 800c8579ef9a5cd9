//! # Configuration System
//!
//! TOML-based configuration for the balancer: parsing, defaults and
//! validation. Every section is optional and falls back to its defaults.
//!
//! ## Example Configuration
//!
//! ```toml
//! [instance]
//! name = "geolb-1"
//! listen_address = "0.0.0.0:8080"
//! advertise_address = "10.0.0.5:8080"
//!
//! [coordination]
//! backend = "etcd"
//! endpoints = ["localhost:2379"]
//! lock_key = "active-server-address"
//! lease_ttl = "20s"
//!
//! [election]
//! poll_interval = "10s"
//! retry_interval = "2s"
//!
//! [health]
//! probe_timeout = "1s"
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [[backends]]
//! address = "http://localhost:3030"
//! latitude = 10.5
//! longitude = 20.6
//! ```

mod error;
mod loader;
mod types;
mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, ConfigSource, Deployment};
pub use types::{GeoLbConfig, InstanceSection, LogFormat, LogLevel, LoggingConfig};
pub use validation::{
    AddressConflictValidator, BasicValidator, ValidationError, ValidationResult,
    ValidationSeverity, Validator,
};
