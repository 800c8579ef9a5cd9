//! etcd coordination store.

use super::config::{ttl_secs, CoordinationConfig};
use super::error::{CoordinationError, CoordinationResult};
use super::store::{CoordinationStore, LeaseId, StoreFuture};
use etcd_client::{Client, Compare, CompareOp, ConnectOptions, PutOptions, Txn, TxnOp};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Coordination store backed by an etcd cluster.
///
/// The client is connected lazily and dropped after a transport failure, so
/// the next call reconnects.
pub struct EtcdStore {
    endpoints: Vec<String>,
    connect_timeout: Duration,
    request_timeout: Duration,
    client: Mutex<Option<Client>>,
}

impl EtcdStore {
    /// Create a store for the configured endpoints.
    #[must_use]
    pub fn new(config: &CoordinationConfig) -> Self {
        Self {
            endpoints: config.endpoints.clone(),
            connect_timeout: config.connect_timeout,
            request_timeout: config.request_timeout,
            client: Mutex::new(None),
        }
    }

    /// Configured endpoints.
    #[must_use]
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    fn connect_options(&self) -> ConnectOptions {
        ConnectOptions::new()
            .with_connect_timeout(self.connect_timeout)
            .with_timeout(self.request_timeout)
    }

    async fn client(&self) -> CoordinationResult<Client> {
        let mut cached = self.client.lock().await;
        if let Some(client) = cached.as_ref() {
            return Ok(client.clone());
        }

        debug!(endpoints = ?self.endpoints, "Connecting to etcd");
        let client = Client::connect(self.endpoints.clone(), Some(self.connect_options()))
            .await
            .map_err(|e| {
                CoordinationError::Connectivity(format!(
                    "connect to {}: {e}",
                    self.endpoints.join(",")
                ))
            })?;
        *cached = Some(client.clone());
        Ok(client)
    }

    /// Map an etcd error, dropping the cached client on transport failures.
    async fn map_error(&self, err: etcd_client::Error) -> CoordinationError {
        match err {
            etcd_client::Error::GRpcStatus(status) => {
                CoordinationError::Store(status.message().to_string())
            },
            other => {
                warn!(error = %other, "etcd transport failure, dropping client");
                *self.client.lock().await = None;
                CoordinationError::Connectivity(other.to_string())
            },
        }
    }

    async fn lease_error(&self, lease: LeaseId, err: etcd_client::Error) -> CoordinationError {
        match self.map_error(err).await {
            CoordinationError::Store(message) if message.contains("lease not found") => {
                CoordinationError::LeaseNotFound(lease)
            },
            other => other,
        }
    }
}

impl std::fmt::Debug for EtcdStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtcdStore")
            .field("endpoints", &self.endpoints)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl CoordinationStore for EtcdStore {
    fn grant_lease(&self, ttl: Duration) -> StoreFuture<'_, LeaseId> {
        Box::pin(async move {
            let mut client = self.client().await?;
            match client.lease_grant(ttl_secs(ttl), None).await {
                Ok(response) => Ok(response.id()),
                Err(e) => Err(self.map_error(e).await),
            }
        })
    }

    fn put_if_absent<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        lease: LeaseId,
    ) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let mut client = self.client().await?;
            let txn = Txn::new()
                .when(vec![Compare::version(key, CompareOp::Equal, 0)])
                .and_then(vec![TxnOp::put(
                    key,
                    value,
                    Some(PutOptions::new().with_lease(lease)),
                )]);

            match client.txn(txn).await {
                Ok(response) => Ok(response.succeeded()),
                Err(e) => Err(self.lease_error(lease, e).await),
            }
        })
    }

    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(async move {
            let mut client = self.client().await?;
            let response = match client.get(key, None).await {
                Ok(response) => response,
                Err(e) => return Err(self.map_error(e).await),
            };

            match response.kvs().first() {
                Some(kv) => kv
                    .value_str()
                    .map(|value| Some(value.to_string()))
                    .map_err(|e| CoordinationError::Store(format!("value of '{key}': {e}"))),
                None => Ok(None),
            }
        })
    }

    fn delete_owned<'a>(&'a self, key: &'a str, lease: LeaseId) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let mut client = self.client().await?;
            let txn = Txn::new()
                .when(vec![Compare::lease(key, CompareOp::Equal, lease)])
                .and_then(vec![TxnOp::delete(key, None)]);

            match client.txn(txn).await {
                Ok(response) => Ok(response.succeeded()),
                Err(e) => Err(self.map_error(e).await),
            }
        })
    }

    fn revoke_lease(&self, lease: LeaseId) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut client = self.client().await?;
            match client.lease_revoke(lease).await {
                Ok(_) => Ok(()),
                Err(e) => Err(self.lease_error(lease, e).await),
            }
        })
    }

    fn keep_alive(&self, lease: LeaseId) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut client = self.client().await?;
            let (mut keeper, mut stream) = match client.lease_keep_alive(lease).await {
                Ok(pair) => pair,
                Err(e) => return Err(self.lease_error(lease, e).await),
            };

            if let Err(e) = keeper.keep_alive().await {
                return Err(self.lease_error(lease, e).await);
            }

            match stream.message().await {
                Ok(Some(ack)) if ack.ttl() > 0 => Ok(()),
                Ok(Some(_)) => Err(CoordinationError::LeaseNotFound(lease)),
                Ok(None) => Err(CoordinationError::Connectivity(
                    "keep-alive stream closed".to_string(),
                )),
                Err(e) => Err(self.lease_error(lease, e).await),
            }
        })
    }

    fn name(&self) -> &'static str {
        "etcd"
    }
}
