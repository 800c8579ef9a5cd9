//! Reachability probing for backends and peer instances.
//!
//! The probe is a bare TCP connect with a short timeout. It detects a
//! process that is not listening, but not one that is listening and failing
//! at the application level.

use super::config::HealthCheckConfig;
use std::borrow::Cow;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Binary reachability check.
///
/// Implementations never fail: any connectivity problem is reported as
/// `false`.
pub trait HealthProbe: Send + Sync {
    /// Check whether `address` (`host:port`) accepts connections.
    fn is_healthy<'a>(
        &'a self,
        address: &'a str,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>>;
}

/// TCP connect probe.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    /// Connect timeout.
    timeout: Duration,
}

impl TcpProbe {
    /// Create a probe with the given connect timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Create a probe from configuration.
    #[must_use]
    pub fn from_config(config: &HealthCheckConfig) -> Self {
        Self::new(config.probe_timeout)
    }

    /// Get the connect timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn check_tcp(&self, address: &str) -> Result<(), String> {
        let target = dial_target(address);
        match timeout(self.timeout, TcpStream::connect(&*target)).await {
            // The stream is dropped right away; no payload is exchanged.
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(format!("connection failed: {e}")),
            Err(_) => Err("connection timeout".to_string()),
        }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::from_config(&HealthCheckConfig::default())
    }
}

impl HealthProbe for TcpProbe {
    fn is_healthy<'a>(
        &'a self,
        address: &'a str,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(async move {
            let start = Instant::now();
            match self.check_tcp(address).await {
                Ok(()) => {
                    debug!(
                        target_addr = %address,
                        response_time_ms = start.elapsed().as_millis(),
                        "Health probe passed"
                    );
                    true
                },
                Err(e) => {
                    debug!(target_addr = %address, error = %e, "Health probe failed");
                    false
                },
            }
        })
    }
}

/// An address with an empty host (`:8080`) means the local machine.
fn dial_target(address: &str) -> Cow<'_, str> {
    if address.starts_with(':') {
        Cow::Owned(format!("127.0.0.1{address}"))
    } else {
        Cow::Borrowed(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_probe_creation() {
        let probe = TcpProbe::new(Duration::from_millis(250));
        assert_eq!(probe.timeout(), Duration::from_millis(250));
        assert_eq!(TcpProbe::default().timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_dial_target() {
        assert_eq!(dial_target(":8080"), "127.0.0.1:8080");
        assert_eq!(dial_target("10.0.0.1:8080"), "10.0.0.1:8080");
    }

    #[tokio::test]
    async fn test_probe_listening() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let probe = TcpProbe::new(Duration::from_secs(1));
        assert!(probe.is_healthy(&address).await);
    }

    #[tokio::test]
    async fn test_probe_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let probe = TcpProbe::new(Duration::from_secs(1));
        assert!(!probe.is_healthy(&address).await);
    }

    #[tokio::test]
    async fn test_probe_unreachable() {
        let probe = TcpProbe::new(Duration::from_millis(100));
        // TEST-NET, not routable
        assert!(!probe.is_healthy("192.0.2.1:65535").await);
    }

    #[tokio::test]
    async fn test_probe_unresolvable() {
        let probe = TcpProbe::new(Duration::from_millis(500));
        assert!(!probe.is_healthy("not-a-real-host.invalid:80").await);
    }
}
