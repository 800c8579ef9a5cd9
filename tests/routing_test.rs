//! End-to-end routing through an elected instance.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::client::conn::http1 as client_http1;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use r0n_geolb::config::{Deployment, GeoLbConfig};
use r0n_geolb::gateway::Gateway;
use r0n_geolb::modules::coordination::MemoryStore;
use r0n_geolb::modules::failover::InstanceRole;
use r0n_geolb::modules::load_balancer::BackendConfig;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Backend that answers with its name and echoes the request line.
async fn spawn_backend(name: &'static str) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| async move {
                    let echo = req
                        .headers()
                        .get("X-Trace")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-")
                        .to_string();
                    let line = format!("{name} {} {} {echo}", req.method(), req.uri());
                    let body = req.into_body().collect().await.unwrap().to_bytes();
                    let mut text = line.into_bytes();
                    if !body.is_empty() {
                        text.push(b' ');
                        text.extend_from_slice(&body);
                    }
                    Ok::<_, Infallible>(
                        Response::builder()
                            .header("X-Backend", name)
                            .body(Full::new(Bytes::from(text)))
                            .unwrap(),
                    )
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    (addr, handle)
}

fn free_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

struct Client {
    addr: SocketAddr,
}

impl Client {
    async fn send(
        &self,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
        body: &'static str,
    ) -> (StatusCode, Option<String>, String) {
        let stream = TcpStream::connect(self.addr).await.unwrap();
        let (mut sender, conn) = client_http1::handshake(TokioIo::new(stream))
            .await
            .unwrap();
        tokio::spawn(conn);

        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("Host", "geo.example");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let req = builder.body(Full::new(Bytes::from(body))).unwrap();

        let resp = sender.send_request(req).await.unwrap();
        let status = resp.status();
        let backend = resp
            .headers()
            .get("X-Backend")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, backend, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn get_from(&self, lat: &str, lon: &str) -> (StatusCode, Option<String>, String) {
        self.send("GET", "/", &[("Latitude", lat), ("Longitude", lon)], "")
            .await
    }
}

async fn start_gateway(
    backends: Vec<BackendConfig>,
) -> (Client, watch::Sender<bool>, JoinHandle<()>) {
    let mut config = GeoLbConfig::default();
    config.instance.listen_address = free_addr();
    config.control.enabled = false;
    config.health.probe_timeout = Duration::from_millis(200);
    config.backends = backends;

    let listen = config.instance.listen_address;
    let deployment = Deployment::resolve(config).unwrap();
    let gateway = Gateway::with_store(deployment, Arc::new(MemoryStore::new()));
    let mut role = gateway.status().subscribe();
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        gateway.run(rx).await.unwrap();
    });

    tokio::time::timeout(Duration::from_secs(5), async {
        while *role.borrow_and_update() != InstanceRole::Active {
            role.changed().await.unwrap();
        }
    })
    .await
    .expect("instance did not become active");

    (Client { addr: listen }, tx, handle)
}

#[tokio::test]
async fn test_routes_to_nearest_backend() {
    let (asia, _asia_task) = spawn_backend("asia").await;
    let (arctic, _arctic_task) = spawn_backend("arctic").await;

    let (client, shutdown, handle) = start_gateway(vec![
        BackendConfig::new(format!("http://{asia}"), 10.5, 20.6),
        BackendConfig::new(format!("http://{arctic}"), 70.5, 46.5),
    ])
    .await;

    let (status, backend, _) = client.get_from("12.0", "21.0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(backend.as_deref(), Some("asia"));

    let (status, backend, _) = client.get_from("69.0", "45.0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(backend.as_deref(), Some("arctic"));

    shutdown.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_forwards_request_unmodified() {
    let (only, _task) = spawn_backend("only").await;
    let (client, shutdown, handle) =
        start_gateway(vec![BackendConfig::new(only.to_string(), 0.0, 0.0)]).await;

    let (status, backend, body) = client
        .send(
            "POST",
            "/orders/42?expand=items",
            &[("Latitude", "1.0"), ("Longitude", "1.0"), ("X-Trace", "abc123")],
            "payload",
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(backend.as_deref(), Some("only"));
    assert_eq!(body, "only POST /orders/42?expand=items abc123 payload");

    shutdown.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_skips_unreachable_nearest_backend() {
    let (far, _far_task) = spawn_backend("far").await;
    let near = free_addr();

    let (client, shutdown, handle) = start_gateway(vec![
        BackendConfig::new(format!("http://{near}"), 10.0, 10.0),
        BackendConfig::new(format!("http://{far}"), -40.0, 150.0),
    ])
    .await;

    let (status, backend, _) = client.get_from("10.0", "10.0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(backend.as_deref(), Some("far"));

    shutdown.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_rejects_invalid_location() {
    let (only, _task) = spawn_backend("only").await;
    let (client, shutdown, handle) =
        start_gateway(vec![BackendConfig::new(only.to_string(), 0.0, 0.0)]).await;

    let (status, backend, _) = client.send("GET", "/", &[("Latitude", "10.0")], "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(backend, None);

    let (status, _, _) = client.get_from("north", "10.0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = client.get_from("91.0", "10.0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    shutdown.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_all_backends_down_is_service_unavailable() {
    let (client, shutdown, handle) = start_gateway(vec![
        BackendConfig::new(free_addr().to_string(), 10.0, 10.0),
        BackendConfig::new(free_addr().to_string(), 20.0, 20.0),
    ])
    .await;

    for _ in 0..3 {
        let (status, backend, _) = client.get_from("10.0", "10.0").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(backend, None);
    }

    shutdown.send(true).unwrap();
    handle.await.unwrap();
}
