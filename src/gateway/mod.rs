//! Process wiring: configuration to store, election, control endpoint and
//! serving.

mod error;

pub use error::{GatewayError, GatewayResult};

use crate::config::{Deployment, GeoLbConfig};
use crate::modules::control::{ControlServer, ControlState};
use crate::modules::coordination::{build_store, CoordinationLock, CoordinationStore};
use crate::modules::failover::{
    keep_lease_alive, Candidacy, ElectionError, ElectionStatus, FailoverController,
};
use crate::modules::load_balancer::{
    serve, GeoBalancer, HealthProbe, HttpForwarder, RequestRouter, TcpProbe,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// One balancer instance.
///
/// Contends for the active slot, then serves client traffic until shutdown.
/// The slot is not released on shutdown; it lapses with its lease.
#[derive(Debug)]
pub struct Gateway {
    config: GeoLbConfig,
    controller: FailoverController,
    router: Arc<RequestRouter>,
}

impl Gateway {
    /// Build an instance with the store selected in the configuration.
    ///
    /// # Errors
    ///
    /// Fails if the store backend is unavailable.
    pub fn new(deployment: Deployment) -> GatewayResult<Self> {
        let store = build_store(&deployment.config().coordination)?;
        Ok(Self::with_store(deployment, store))
    }

    /// Build an instance on an existing store.
    #[must_use]
    pub fn with_store(deployment: Deployment, store: Arc<dyn CoordinationStore>) -> Self {
        let (config, advertise_address, directory) = deployment.into_parts();
        let probe: Arc<dyn HealthProbe> = Arc::new(TcpProbe::from_config(&config.health));

        let balancer = Arc::new(GeoBalancer::new(directory, Arc::clone(&probe)));
        let router = Arc::new(RequestRouter::new(
            balancer,
            HttpForwarder::default(),
            config.router.clone(),
        ));

        let candidacy = Candidacy {
            lock_key: config.coordination.lock_key.clone(),
            lease_ttl: config.coordination.lease_ttl,
            listen_address: config.instance.listen_address,
            advertise_address,
        };
        let controller = FailoverController::new(
            CoordinationLock::new(store),
            probe,
            config.election.clone(),
            candidacy,
        );

        Self {
            config,
            controller,
            router,
        }
    }

    /// Shared election status.
    #[must_use]
    pub fn status(&self) -> &Arc<ElectionStatus> {
        self.controller.status()
    }

    /// The request router served once active.
    #[must_use]
    pub fn router(&self) -> &Arc<RequestRouter> {
        &self.router
    }

    /// Run until `shutdown` fires.
    ///
    /// Shutdown before the election is won is a clean exit.
    ///
    /// # Errors
    ///
    /// Fails if the control endpoint cannot bind or the public listener
    /// cannot bind for a reason other than the address being in use.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> GatewayResult<()> {
        info!(
            instance = %self.config.instance.name,
            store = self.controller.lock().store().name(),
            backends = self.config.backends.len(),
            "Starting geo load balancer"
        );

        let mut control = ControlServer::new(
            self.config.control.clone(),
            ControlState {
                instance: self.config.instance.name.clone(),
                status: Arc::clone(self.controller.status()),
                balancer: Arc::clone(self.router.balancer()),
            },
        );
        control.start().await?;

        let result = self.serve_when_elected(shutdown).await;

        if control.is_running() {
            let _ = control.stop().await;
        }
        result
    }

    async fn serve_when_elected(&self, shutdown: watch::Receiver<bool>) -> GatewayResult<()> {
        let elected = match self.controller.run(shutdown.clone()).await {
            Ok(elected) => elected,
            Err(ElectionError::Cancelled) => {
                info!("Shutdown before election completed");
                return Ok(());
            },
            Err(e) => return Err(e.into()),
        };

        let guard = elected.guard;
        let keeper = if self.config.election.keep_alive {
            let lock = self.controller.lock().clone();
            let shutdown = shutdown.clone();
            Some(tokio::spawn(async move {
                keep_lease_alive(lock, &guard, shutdown).await;
                guard
            }))
        } else {
            drop(guard);
            None
        };

        serve(elected.listener, Arc::clone(&self.router), shutdown).await;

        if let Some(keeper) = keeper {
            if let Err(e) = keeper.await {
                warn!("Lease keep-alive task failed: {e}");
            }
        }
        info!("Geo load balancer stopped");
        Ok(())
    }
}
