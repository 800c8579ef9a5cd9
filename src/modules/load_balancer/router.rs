//! Per-request routing on the active instance.

use super::balancer::GeoBalancer;
use super::config::RouterConfig;
use super::error::{LoadBalancerError, LoadBalancerResult};
use super::geo::GeoPoint;
use super::proxy::{full_body, HttpForwarder, ProxyBody};
use http::HeaderMap;
use http_body_util::BodyExt;
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, warn};

/// Routes each request to the nearest healthy backend.
#[derive(Debug)]
pub struct RequestRouter {
    /// Backend selection.
    balancer: Arc<GeoBalancer>,
    /// Backend transport.
    forwarder: HttpForwarder,
    /// Header names.
    config: RouterConfig,
}

impl RequestRouter {
    /// Create a router.
    #[must_use]
    pub fn new(balancer: Arc<GeoBalancer>, forwarder: HttpForwarder, config: RouterConfig) -> Self {
        Self {
            balancer,
            forwarder,
            config,
        }
    }

    /// The balancer used for selection.
    #[must_use]
    pub fn balancer(&self) -> &Arc<GeoBalancer> {
        &self.balancer
    }

    /// Read the requester location from the configured headers.
    ///
    /// # Errors
    ///
    /// Returns [`LoadBalancerError::InvalidRequestLocation`] if either header
    /// is missing, not a number, or out of range.
    pub fn parse_location(&self, headers: &HeaderMap) -> LoadBalancerResult<GeoPoint> {
        let latitude = read_coordinate(headers, &self.config.latitude_header)?;
        let longitude = read_coordinate(headers, &self.config.longitude_header)?;

        let point = GeoPoint::new(latitude, longitude);
        if !point.is_valid() {
            return Err(LoadBalancerError::InvalidRequestLocation(format!(
                "coordinates {point} are out of range"
            )));
        }
        Ok(point)
    }

    /// Route a request: locate the requester, select a backend, forward.
    ///
    /// # Errors
    ///
    /// Returns the first terminal failure: invalid location, no healthy
    /// backend, or a failed forward.
    pub async fn route<B>(&self, req: Request<B>) -> LoadBalancerResult<Response<ProxyBody>>
    where
        B: Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let location = self.parse_location(req.headers())?;
        let selected = self.balancer.select_backend(location).await?;

        debug!(
            method = %req.method(),
            uri = %req.uri(),
            backend = %selected.server,
            "Forwarding request"
        );

        match self.forwarder.forward(req, &selected.server).await {
            Ok(response) => {
                self.balancer.stats().record_forward(true);
                Ok(response.map(|body| body.boxed()))
            },
            Err(e) => {
                self.balancer.stats().record_forward(false);
                Err(e)
            },
        }
    }

    /// Route a request and turn any failure into an HTTP error response.
    pub async fn handle<B>(&self, req: Request<B>) -> Result<Response<ProxyBody>, Infallible>
    where
        B: Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        match self.route(req).await {
            Ok(response) => Ok(response),
            Err(e) => {
                let status = status_for(&e);
                if e.is_client_error() {
                    debug!(error = %e, "Rejected request");
                } else if matches!(e, LoadBalancerError::ForwardFailed { .. }) {
                    warn!(error = %e, "Forward failed");
                }
                Ok(error_response(status, &e))
            },
        }
    }
}

fn read_coordinate(headers: &HeaderMap, name: &str) -> LoadBalancerResult<f64> {
    let value = headers.get(name).ok_or_else(|| {
        LoadBalancerError::InvalidRequestLocation(format!("missing header '{name}'"))
    })?;

    value
        .to_str()
        .ok()
        .map(str::trim)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            LoadBalancerError::InvalidRequestLocation(format!("header '{name}' is not a number"))
        })
}

/// Map a routing failure to the response status the client sees.
#[must_use]
pub fn status_for(error: &LoadBalancerError) -> StatusCode {
    match error {
        LoadBalancerError::InvalidRequestLocation(_) => StatusCode::BAD_REQUEST,
        LoadBalancerError::NoHealthyBackend(_) | LoadBalancerError::EmptyDirectory => {
            StatusCode::SERVICE_UNAVAILABLE
        },
        LoadBalancerError::ForwardFailed { .. }
        | LoadBalancerError::InvalidBackendAddress { .. }
        | LoadBalancerError::IoError(_) => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(status: StatusCode, error: &LoadBalancerError) -> Response<ProxyBody> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(full_body(format!("{error}\n")))
        .expect("response build failed")
}
