//! Public HTTP listener for the active instance.

use super::router::RequestRouter;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Accept connections on `listener` and route every request through
/// `router` until `shutdown` fires.
///
/// Each connection runs on its own task; requests share nothing but the
/// router's immutable state. Connections already accepted are allowed to
/// finish after shutdown.
pub async fn serve(
    listener: TcpListener,
    router: Arc<RequestRouter>,
    mut shutdown: watch::Receiver<bool>,
) {
    if *shutdown.borrow() {
        return;
    }

    match listener.local_addr() {
        Ok(addr) => info!(%addr, "Serving client traffic"),
        Err(e) => debug!("Listener address unavailable: {e}"),
    }

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, remote_addr)) => {
                        debug!(%remote_addr, "New client connection");
                        let router = Arc::clone(&router);

                        tokio::spawn(async move {
                            let io = TokioIo::new(stream);
                            let service = service_fn(move |req: Request<Incoming>| {
                                let router = Arc::clone(&router);
                                async move { router.handle(req).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                debug!(%remote_addr, "Connection error: {e}");
                            }
                        });
                    }
                    Err(e) => {
                        error!("Accept error: {e}");
                    }
                }
            }
            _ = shutdown.changed() => {
                info!("Stopped accepting client traffic");
                break;
            }
        }
    }
}
