//! Load balancer configuration types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a single backend in the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend address, either `host:port` or `http://host[:port]`.
    pub address: String,

    /// Latitude in decimal degrees.
    pub latitude: f64,

    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl BackendConfig {
    /// Create a backend entry.
    pub fn new(address: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            address: address.into(),
            latitude,
            longitude,
        }
    }
}

/// Health probe configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Connect timeout for a single probe.
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(1),
        }
    }
}

/// Request routing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Header carrying the requester latitude.
    pub latitude_header: String,

    /// Header carrying the requester longitude.
    pub longitude_header: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            latitude_header: "Latitude".to_string(),
            longitude_header: "Longitude".to_string(),
        }
    }
}

/// The sample directory shipped as the default configuration.
#[must_use]
pub fn default_backends() -> Vec<BackendConfig> {
    vec![
        BackendConfig::new("http://localhost:3030", 10.5, 20.6),
        BackendConfig::new("http://localhost:3031", 70.5, 46.5),
    ]
}
