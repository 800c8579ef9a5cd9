//! Configuration type definitions.

use crate::modules::control::ControlConfig;
use crate::modules::coordination::CoordinationConfig;
use crate::modules::failover::ElectionConfig;
use crate::modules::load_balancer::config::default_backends;
use crate::modules::load_balancer::{BackendConfig, HealthCheckConfig, RouterConfig};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoLbConfig {
    /// Instance identity and public listener.
    pub instance: InstanceSection,

    /// Coordination store.
    pub coordination: CoordinationConfig,

    /// Election timing.
    pub election: ElectionConfig,

    /// Backend health probing.
    pub health: HealthCheckConfig,

    /// Request location headers.
    pub router: RouterConfig,

    /// Control endpoint.
    pub control: ControlConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Backend directory, in tie-break order.
    pub backends: Vec<BackendConfig>,
}

impl Default for GeoLbConfig {
    fn default() -> Self {
        Self {
            instance: InstanceSection::default(),
            coordination: CoordinationConfig::default(),
            election: ElectionConfig::default(),
            health: HealthCheckConfig::default(),
            router: RouterConfig::default(),
            control: ControlConfig::default(),
            logging: LoggingConfig::default(),
            backends: default_backends(),
        }
    }
}

/// Instance section configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceSection {
    /// Instance name.
    pub name: String,

    /// Address the public listener binds to once active.
    pub listen_address: SocketAddr,

    /// Address recorded in the active slot for standby instances to probe.
    /// Defaults to the listen address, with an unspecified IP replaced by
    /// loopback.
    pub advertise_address: Option<String>,
}

impl Default for InstanceSection {
    fn default() -> Self {
        Self {
            name: "geolb".to_string(),
            listen_address: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080),
            advertise_address: None,
        }
    }
}

impl InstanceSection {
    /// Address to record in the active slot.
    #[must_use]
    pub fn advertise(&self) -> String {
        if let Some(address) = &self.advertise_address {
            return address.clone();
        }

        let mut address = self.listen_address;
        if address.ip().is_unspecified() {
            let loopback = match address.ip() {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(_) => IpAddr::V6(std::net::Ipv6Addr::LOCALHOST),
            };
            address.set_ip(loopback);
        }
        address.to_string()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: LogLevel,

    /// Log format (json, pretty, compact).
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level (most verbose).
    Trace,
    /// Debug level.
    Debug,
    /// Info level (default).
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level (least verbose).
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (machine-readable).
    Json,
    /// Pretty multi-line format (default).
    #[default]
    Pretty,
    /// Compact single-line format.
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::coordination::StoreBackend;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = GeoLbConfig::default();
        assert_eq!(config.instance.name, "geolb");
        assert_eq!(config.instance.listen_address.port(), 8080);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.coordination.lease_ttl, Duration::from_secs(20));
    }

    #[test]
    fn test_advertise_defaults_to_loopback() {
        let instance = InstanceSection::default();
        assert_eq!(instance.advertise(), "127.0.0.1:8080");

        let instance = InstanceSection {
            listen_address: "10.1.2.3:9090".parse().unwrap(),
            ..InstanceSection::default()
        };
        assert_eq!(instance.advertise(), "10.1.2.3:9090");

        let instance = InstanceSection {
            advertise_address: Some("lb-1.internal:8080".to_string()),
            ..InstanceSection::default()
        };
        assert_eq!(instance.advertise(), "lb-1.internal:8080");
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [instance]
            name = "geolb-eu"
            listen_address = "0.0.0.0:8081"
            advertise_address = "10.0.0.5:8081"

            [coordination]
            backend = "etcd"
            endpoints = ["etcd-0:2379"]
            lease_ttl = "15s"

            [election]
            poll_interval = "5s"
            retry_interval = "1s"

            [health]
            probe_timeout = "500ms"

            [router]
            latitude_header = "X-Lat"
            longitude_header = "X-Lon"

            [control]
            port = 9100

            [logging]
            level = "debug"
            format = "json"

            [[backends]]
            address = "http://10.0.1.1:3030"
            latitude = 48.85
            longitude = 2.35
        "#;

        let config: GeoLbConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.instance.name, "geolb-eu");
        assert_eq!(config.instance.advertise(), "10.0.0.5:8081");
        assert_eq!(config.coordination.backend, StoreBackend::Etcd);
        assert_eq!(config.coordination.lease_ttl, Duration::from_secs(15));
        assert_eq!(config.election.poll_interval, Duration::from_secs(5));
        assert_eq!(config.health.probe_timeout, Duration::from_millis(500));
        assert_eq!(config.router.latitude_header, "X-Lat");
        assert_eq!(config.control.port, 9100);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.backends.len(), 1);
        assert_eq!(config.backends[0].latitude, 48.85);
    }
}
