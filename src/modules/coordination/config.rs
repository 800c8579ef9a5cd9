//! Coordination store configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which coordination store to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreBackend {
    /// In-process store. Only instances in the same process see each other.
    #[default]
    Memory,
    /// etcd cluster (requires the `etcd` feature).
    Etcd,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Etcd => write!(f, "etcd"),
        }
    }
}

/// Coordination configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    /// Store backend.
    pub backend: StoreBackend,

    /// Store endpoints (etcd only).
    pub endpoints: Vec<String>,

    /// Key of the active slot.
    pub lock_key: String,

    /// Lifetime of the lease bound to the active slot.
    #[serde(with = "humantime_serde")]
    pub lease_ttl: Duration,

    /// Timeout for establishing a store connection.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Timeout for a single store request.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl CoordinationConfig {
    /// Lease TTL in whole seconds, rounded up, at least one.
    #[must_use]
    pub fn lease_ttl_secs(&self) -> i64 {
        ttl_secs(self.lease_ttl)
    }
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            endpoints: vec!["localhost:2379".to_string()],
            lock_key: "active-server-address".to_string(),
            lease_ttl: Duration::from_secs(20),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Round a TTL up to whole seconds, with a minimum of one.
#[must_use]
pub fn ttl_secs(ttl: Duration) -> i64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    i64::try_from(secs.max(1)).unwrap_or(i64::MAX)
}
