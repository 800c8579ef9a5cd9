//! Control HTTP endpoint.

use super::config::ControlConfig;
use super::error::{ControlError, ControlResult};
use crate::modules::failover::ElectionStatus;
use crate::modules::load_balancer::GeoBalancer;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// State the control endpoint reports on.
#[derive(Debug, Clone)]
pub struct ControlState {
    /// Instance name.
    pub instance: String,
    /// Election status.
    pub status: Arc<ElectionStatus>,
    /// Backend selection.
    pub balancer: Arc<GeoBalancer>,
}

/// Liveness, readiness and election status over HTTP.
///
/// | Path                 | Response                                  |
/// |----------------------|-------------------------------------------|
/// | `/health`, `/healthz`| 200 while the process runs                |
/// | `/ready`             | 200 when active, 503 otherwise            |
/// | `/status`            | JSON election and selection state         |
#[derive(Debug)]
pub struct ControlServer {
    /// Configuration.
    config: ControlConfig,
    /// Reported state.
    state: ControlState,
    /// Bound address once started.
    local_addr: Option<SocketAddr>,
    /// Shutdown sender.
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl ControlServer {
    /// Create a new control server.
    #[must_use]
    pub fn new(config: ControlConfig, state: ControlState) -> Self {
        Self {
            config,
            state,
            local_addr: None,
            shutdown_tx: None,
        }
    }

    /// Start the HTTP server.
    pub async fn start(&mut self) -> ControlResult<()> {
        if self.shutdown_tx.is_some() {
            return Err(ControlError::AlreadyRunning);
        }

        if !self.config.enabled {
            info!("Control endpoint is disabled");
            return Ok(());
        }

        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ControlError::BindError(format!("{addr}: {e}")))?;
        let local_addr = listener.local_addr()?;

        info!(addr = %local_addr, "Control endpoint listening");

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown_tx = Some(shutdown_tx);
        self.local_addr = Some(local_addr);

        let state = Arc::new(self.state.clone());

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok((stream, remote_addr)) => {
                                debug!(%remote_addr, "New control connection");
                                let state = Arc::clone(&state);

                                tokio::spawn(async move {
                                    let io = TokioIo::new(stream);
                                    let service = service_fn(move |req| {
                                        let state = Arc::clone(&state);
                                        async move { handle_request(req, &state).await }
                                    });

                                    if let Err(e) = http1::Builder::new()
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        debug!("Connection error: {e}");
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Accept error: {e}");
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Control endpoint shutting down");
                        break;
                    }
                }
            }
        });

        Ok(())
    }

    /// Stop the HTTP server.
    pub async fn stop(&mut self) -> ControlResult<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
            self.local_addr = None;
            Ok(())
        } else {
            Err(ControlError::NotRunning)
        }
    }

    /// Check if the server is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }

    /// Address the server is bound to, once started.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

/// Handle an HTTP request.
async fn handle_request(
    req: Request<Incoming>,
    state: &ControlState,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match req.uri().path() {
        "/health" | "/healthz" => Ok(text_response(StatusCode::OK, "OK")),
        "/ready" => {
            let role = state.status.role();
            if role.is_active() {
                Ok(text_response(StatusCode::OK, "active"))
            } else {
                Ok(text_response(StatusCode::SERVICE_UNAVAILABLE, &role.to_string()))
            }
        },
        "/status" => {
            let body = status_body(state);
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "application/json")
                .body(Full::new(Bytes::from(body)))
                .expect("response build failed"))
        },
        _ => Ok(text_response(StatusCode::NOT_FOUND, "Not Found")),
    }
}

fn text_response(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("response build failed")
}

fn status_body(state: &ControlState) -> String {
    let election = state.status.snapshot();
    let stats = state.balancer.stats();

    json!({
        "instance": state.instance,
        "role": election.role,
        "role_age_secs": election.role_age_secs,
        "consecutive_failures": election.consecutive_failures,
        "total_failures": election.total_failures,
        "last_holder": election.last_holder,
        "backends": state.balancer.directory().len(),
        "selection": {
            "in_outage": state.balancer.in_outage(),
            "total": stats.total_selections.load(Ordering::Relaxed),
            "failed": stats.failed_selections.load(Ordering::Relaxed),
            "skipped_backends": stats.skipped_backends.load(Ordering::Relaxed),
            "forwarded": stats.forwarded_requests.load(Ordering::Relaxed),
            "failed_forwards": stats.failed_forwards.load(Ordering::Relaxed),
        },
    })
    .to_string()
}
