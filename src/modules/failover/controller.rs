//! The election loop.

use super::backoff::ExponentialBackoff;
use super::config::ElectionConfig;
use super::error::{ElectionError, ElectionResult};
use super::status::{ElectionStatus, InstanceRole};
use crate::modules::coordination::{CoordinationError, CoordinationLock, LockGuard};
use crate::modules::load_balancer::HealthProbe;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// What this instance claims when it contends for the active slot.
#[derive(Debug, Clone)]
pub struct Candidacy {
    /// Key of the active slot.
    pub lock_key: String,
    /// Lease lifetime of the slot record.
    pub lease_ttl: Duration,
    /// Address the public listener binds to.
    pub listen_address: SocketAddr,
    /// Address recorded in the slot, probed by standby instances.
    pub advertise_address: String,
}

/// Outcome of a won election.
#[derive(Debug)]
pub struct Elected {
    /// Bound public listener.
    pub listener: TcpListener,
    /// Ownership of the active slot.
    pub guard: LockGuard,
}

/// Result of one pass through the loop.
#[derive(Debug)]
enum Step {
    Elected(Elected),
    HolderHealthy,
    HolderUnresponsive,
    StoreFailure,
    AddressInUse,
}

/// Drives an instance from contending to active.
///
/// ```text
///            acquire ok, bind ok
/// Contending ─────────────────────▶ Active (terminal)
///   │   ▲ ▲
///   │   │ └── holder unresponsive / store failure / address in use
///   ▼   │
/// Standby ── holder healthy, poll again
/// ```
pub struct FailoverController {
    lock: CoordinationLock,
    probe: Arc<dyn HealthProbe>,
    config: ElectionConfig,
    candidacy: Candidacy,
    status: Arc<ElectionStatus>,
}

impl FailoverController {
    /// Create a controller.
    #[must_use]
    pub fn new(
        lock: CoordinationLock,
        probe: Arc<dyn HealthProbe>,
        config: ElectionConfig,
        candidacy: Candidacy,
    ) -> Self {
        Self {
            lock,
            probe,
            config,
            candidacy,
            status: Arc::new(ElectionStatus::new()),
        }
    }

    /// Shared election status.
    #[must_use]
    pub fn status(&self) -> &Arc<ElectionStatus> {
        &self.status
    }

    /// What this instance claims.
    #[must_use]
    pub fn candidacy(&self) -> &Candidacy {
        &self.candidacy
    }

    /// The lock the controller contends on.
    #[must_use]
    pub fn lock(&self) -> &CoordinationLock {
        &self.lock
    }

    /// Contend until this instance is active or `shutdown` fires.
    ///
    /// In-flight store calls, probes and waits are abandoned on shutdown.
    /// A dropped shutdown sender counts as shutdown.
    ///
    /// # Errors
    ///
    /// [`ElectionError::Cancelled`] on shutdown, or
    /// [`ElectionError::ListenerBind`] if the listener fails to bind for a
    /// reason other than the address being in use.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> ElectionResult<Elected> {
        let mut backoff = ExponentialBackoff::from_config(&self.config);

        info!(
            key = %self.candidacy.lock_key,
            advertise = %self.candidacy.advertise_address,
            "Contending for active slot"
        );

        loop {
            if *shutdown.borrow() {
                return Err(ElectionError::Cancelled);
            }

            let step = tokio::select! {
                step = self.step() => step?,
                _ = shutdown.changed() => return Err(ElectionError::Cancelled),
            };

            let wait = match step {
                Step::Elected(elected) => return Ok(elected),
                Step::HolderHealthy => {
                    backoff.reset();
                    self.config.poll_interval
                },
                Step::HolderUnresponsive => {
                    backoff.reset();
                    self.config.retry_interval
                },
                Step::StoreFailure => backoff.next_delay(),
                Step::AddressInUse => {
                    backoff.reset();
                    self.config.bind_retry_delay
                },
            };

            debug!(wait = ?wait, role = %self.status.role(), "Waiting before next attempt");
            tokio::select! {
                () = tokio::time::sleep(wait) => {},
                _ = shutdown.changed() => return Err(ElectionError::Cancelled),
            }
        }
    }

    async fn step(&self) -> ElectionResult<Step> {
        let candidacy = &self.candidacy;
        let acquired = self
            .lock
            .acquire(
                &candidacy.lock_key,
                &candidacy.advertise_address,
                candidacy.lease_ttl,
            )
            .await;

        match acquired {
            Ok(guard) => {
                self.status.record_success();
                if self.previous_holder_serving().await {
                    self.release(guard).await;
                    return Ok(Step::HolderHealthy);
                }
                self.bind(guard).await
            },
            Err(CoordinationError::LockHeld { .. }) => {
                self.status.record_success();
                Ok(self.inspect_holder().await)
            },
            Err(e) => Ok(self.store_failure(&e)),
        }
    }

    /// Probe whoever holds the slot.
    async fn inspect_holder(&self) -> Step {
        let holder = match self.lock.holder(&self.candidacy.lock_key).await {
            Ok(holder) => holder,
            Err(e) => return self.store_failure(&e),
        };
        let Some(holder) = holder else {
            debug!("Slot holder vanished before it could be probed");
            self.status.set_role(InstanceRole::Contending);
            return Step::HolderUnresponsive;
        };
        self.status.set_last_holder(Some(holder.clone()));

        if self.probe.is_healthy(&holder).await {
            if self.status.set_role(InstanceRole::Standby) {
                info!(%holder, "Active instance is healthy, standing by");
            }
            Step::HolderHealthy
        } else {
            if self.status.set_role(InstanceRole::Contending) {
                info!(%holder, "Active instance is unresponsive, waiting for its lease to lapse");
            } else {
                debug!(%holder, "Active instance still unresponsive");
            }
            Step::HolderUnresponsive
        }
    }

    /// Whether the last holder seen is still serving.
    ///
    /// The active instance never renews its lease, so the slot lapses while
    /// it keeps serving. Winning a lapsed slot does not make this instance
    /// the only one serving.
    async fn previous_holder_serving(&self) -> bool {
        let Some(previous) = self.status.last_holder() else {
            return false;
        };
        if previous == self.candidacy.advertise_address {
            return false;
        }
        if !self.probe.is_healthy(&previous).await {
            return false;
        }

        if self.status.set_role(InstanceRole::Standby) {
            info!(holder = %previous, "Slot lapsed but the active instance is still serving, standing by");
        } else {
            debug!(holder = %previous, "Active instance still serving after its slot lapsed");
        }
        true
    }

    fn store_failure(&self, err: &CoordinationError) -> Step {
        let failures = self.status.record_failure();
        warn!(error = %err, consecutive_failures = failures, "Coordination store call failed");
        self.status.set_role(InstanceRole::Contending);
        Step::StoreFailure
    }

    /// Bind the public listener while holding the slot.
    async fn bind(&self, guard: LockGuard) -> ElectionResult<Step> {
        let address = self.candidacy.listen_address;

        match TcpListener::bind(address).await {
            Ok(listener) => {
                self.status.set_last_holder(Some(guard.value().to_string()));
                self.status.set_role(InstanceRole::Active);
                info!(%address, lease_id = guard.lease_id(), "Instance is active");
                Ok(Step::Elected(Elected { listener, guard }))
            },
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                warn!(%address, "Won the slot but the address is in use, releasing");
                self.release(guard).await;
                self.status.set_role(InstanceRole::Contending);
                Ok(Step::AddressInUse)
            },
            Err(e) => {
                self.release(guard).await;
                self.status.set_role(InstanceRole::Contending);
                Err(ElectionError::ListenerBind {
                    address: address.to_string(),
                    source: e,
                })
            },
        }
    }

    async fn release(&self, guard: LockGuard) {
        if let Err(e) = self.lock.release(guard).await {
            warn!(error = %e, "Failed to release slot, it will lapse with its lease");
        }
    }
}

impl fmt::Debug for FailoverController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailoverController")
            .field("lock", &self.lock)
            .field("config", &self.config)
            .field("candidacy", &self.candidacy)
            .field("role", &self.status.role())
            .finish()
    }
}

/// Refresh the lease behind `guard` every third of its TTL until `shutdown`
/// fires.
///
/// A failed refresh is logged and retried on the next tick.
pub async fn keep_lease_alive(
    lock: CoordinationLock,
    guard: &LockGuard,
    mut shutdown: watch::Receiver<bool>,
) {
    let period = (guard.ttl() / 3).max(Duration::from_millis(1));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;

    debug!(period = ?period, lease_id = guard.lease_id(), "Keeping lease alive");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = lock.keep_alive(guard).await {
                    warn!(error = %e, lease_id = guard.lease_id(), "Lease refresh failed");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}
