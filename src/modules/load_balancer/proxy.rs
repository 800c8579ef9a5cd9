//! HTTP forwarding to a selected backend.

use super::backend::BackendServer;
use super::error::{LoadBalancerError, LoadBalancerResult};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Incoming};
use hyper::client::conn::http1;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Body type returned to clients, either relayed from a backend or
/// generated locally.
pub type ProxyBody = BoxBody<Bytes, hyper::Error>;

/// Wrap a locally generated payload as a [`ProxyBody`].
#[must_use]
pub fn full_body(data: impl Into<Bytes>) -> ProxyBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Forwards requests to backends over fresh HTTP/1.1 connections.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    /// Timeout for establishing the backend connection.
    connect_timeout: Duration,
}

impl HttpForwarder {
    /// Create a forwarder.
    #[must_use]
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Get the connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Send `req` to `backend` unchanged and return the backend's response.
    ///
    /// # Errors
    ///
    /// Returns [`LoadBalancerError::ForwardFailed`] if the connection cannot
    /// be established or the exchange fails.
    pub async fn forward<B>(
        &self,
        req: Request<B>,
        backend: &BackendServer,
    ) -> LoadBalancerResult<Response<Incoming>>
    where
        B: Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let failed = |reason: String| LoadBalancerError::ForwardFailed {
            backend: backend.address().to_string(),
            reason,
        };

        let address = backend.connect_address();
        let stream = match timeout(self.connect_timeout, TcpStream::connect(&address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(failed(format!("connection failed: {e}"))),
            Err(_) => return Err(failed("connection timeout".to_string())),
        };

        let (mut sender, connection) = http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| failed(format!("handshake failed: {e}")))?;

        let backend_addr = address.clone();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(backend = %backend_addr, "Backend connection error: {e}");
            }
        });

        sender
            .send_request(req)
            .await
            .map_err(|e| failed(format!("request failed: {e}")))
    }
}

impl Default for HttpForwarder {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}
