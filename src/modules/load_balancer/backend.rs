//! Backend servers and the static backend directory.

use super::config::BackendConfig;
use super::error::{LoadBalancerError, LoadBalancerResult};
use super::geo::GeoPoint;
use http::uri::{Authority, Uri};
use std::sync::Arc;

/// Port assumed when a backend address does not carry one.
const DEFAULT_HTTP_PORT: u16 = 80;

/// A backend server with a fixed geographic location.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendServer {
    /// Address as configured.
    address: String,
    /// Host and port used to reach the backend.
    authority: Authority,
    /// Where the backend lives.
    location: GeoPoint,
}

impl BackendServer {
    /// Create a backend from an address (`host:port` or `http://host[:port]`)
    /// and a location.
    ///
    /// # Errors
    ///
    /// Returns [`LoadBalancerError::InvalidBackendAddress`] if the address
    /// cannot be parsed, uses a scheme other than `http`, carries a path
    /// or query, or the location is out of range.
    pub fn new(address: impl Into<String>, location: GeoPoint) -> LoadBalancerResult<Self> {
        let address = address.into();
        let authority = parse_authority(&address)?;

        if !location.is_valid() {
            return Err(LoadBalancerError::InvalidBackendAddress {
                address,
                reason: format!("location {location} is out of range"),
            });
        }

        Ok(Self {
            address,
            authority,
            location,
        })
    }

    /// Create a backend from its configuration entry.
    ///
    /// # Errors
    ///
    /// See [`BackendServer::new`].
    pub fn from_config(config: &BackendConfig) -> LoadBalancerResult<Self> {
        Self::new(
            config.address.clone(),
            GeoPoint::new(config.latitude, config.longitude),
        )
    }

    /// The address as configured.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The `host:port` pair used for probing and forwarding.
    #[must_use]
    pub fn connect_address(&self) -> String {
        format!(
            "{}:{}",
            self.authority.host(),
            self.authority.port_u16().unwrap_or(DEFAULT_HTTP_PORT)
        )
    }

    /// The backend location.
    #[must_use]
    pub fn location(&self) -> GeoPoint {
        self.location
    }
}

impl std::fmt::Display for BackendServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.address)
    }
}

fn parse_authority(address: &str) -> LoadBalancerResult<Authority> {
    let invalid = |reason: String| LoadBalancerError::InvalidBackendAddress {
        address: address.to_string(),
        reason,
    };

    let authority = if address.contains("://") {
        let uri: Uri = address.parse().map_err(|e| invalid(format!("{e}")))?;
        match uri.scheme_str() {
            Some("http") => {},
            Some(other) => return Err(invalid(format!("unsupported scheme '{other}'"))),
            None => return Err(invalid("missing scheme".to_string())),
        }
        // Requests are forwarded with their own path; a prefix would be lost.
        if !matches!(uri.path(), "" | "/") || uri.query().is_some() {
            return Err(invalid("path or query is not supported".to_string()));
        }
        uri.authority()
            .cloned()
            .ok_or_else(|| invalid("missing host".to_string()))?
    } else {
        address
            .parse::<Authority>()
            .map_err(|e| invalid(format!("{e}")))?
    };

    if authority.host().is_empty() {
        return Err(invalid("missing host".to_string()));
    }

    Ok(authority)
}

/// The ordered, immutable set of backends known to this instance.
///
/// Cloning is cheap and every clone shares the same snapshot, so request
/// tasks can read it concurrently without locking.
#[derive(Debug, Clone)]
pub struct BackendDirectory {
    backends: Arc<[BackendServer]>,
}

impl BackendDirectory {
    /// Create a directory from already-validated backends.
    #[must_use]
    pub fn new(backends: Vec<BackendServer>) -> Self {
        Self {
            backends: backends.into(),
        }
    }

    /// Build a directory from configuration entries, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns the first entry that fails to parse.
    pub fn from_configs(configs: &[BackendConfig]) -> LoadBalancerResult<Self> {
        let backends = configs
            .iter()
            .map(BackendServer::from_config)
            .collect::<LoadBalancerResult<Vec<_>>>()?;
        Ok(Self::new(backends))
    }

    /// All backends in configuration order.
    #[must_use]
    pub fn backends(&self) -> &[BackendServer] {
        &self.backends
    }

    /// Number of backends.
    #[must_use]
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Whether the directory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
