//! Named mutual-exclusion slot backed by a lease.

use super::error::{CoordinationError, CoordinationResult};
use super::store::{CoordinationStore, LeaseId};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Proof of ownership of a held lock.
///
/// Only [`CoordinationLock::acquire`] creates one, and
/// [`CoordinationLock::release`] consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct LockGuard {
    key: String,
    value: String,
    lease_id: LeaseId,
    ttl: Duration,
}

impl LockGuard {
    /// Lock key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Value recorded under the key (the holder's address).
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Lease the record is bound to.
    #[must_use]
    pub fn lease_id(&self) -> LeaseId {
        self.lease_id
    }

    /// Lease time-to-live.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Lease-based lock over a [`CoordinationStore`].
#[derive(Clone)]
pub struct CoordinationLock {
    store: Arc<dyn CoordinationStore>,
}

impl CoordinationLock {
    /// Create a lock over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn CoordinationStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CoordinationStore> {
        &self.store
    }

    /// Try to take the slot under `key`, recording `value` with a lease of `ttl`.
    ///
    /// Non-blocking: fails with [`CoordinationError::LockHeld`] if another
    /// record exists.
    pub async fn acquire(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> CoordinationResult<LockGuard> {
        let lease_id = self.store.grant_lease(ttl).await?;

        match self.store.put_if_absent(key, value, lease_id).await {
            Ok(true) => {
                info!(key, value, lease_id, store = self.store.name(), "Lock acquired");
                Ok(LockGuard {
                    key: key.to_string(),
                    value: value.to_string(),
                    lease_id,
                    ttl,
                })
            },
            Ok(false) => {
                debug!(key, "Lock held by another instance");
                self.discard_lease(lease_id).await;
                Err(CoordinationError::LockHeld {
                    key: key.to_string(),
                })
            },
            Err(e) => {
                self.discard_lease(lease_id).await;
                Err(e)
            },
        }
    }

    /// Give up the slot: delete the key if this guard still owns it, then
    /// revoke the lease.
    ///
    /// A lease that already expired counts as released. A record written
    /// by another instance after the lease expired is left in place.
    pub async fn release(&self, guard: LockGuard) -> CoordinationResult<()> {
        if !self.store.delete_owned(&guard.key, guard.lease_id).await? {
            debug!(key = %guard.key, lease_id = guard.lease_id, "Slot no longer bound to this lease");
        }

        match self.store.revoke_lease(guard.lease_id).await {
            Ok(()) | Err(CoordinationError::LeaseNotFound(_)) => {
                info!(key = %guard.key, lease_id = guard.lease_id, "Lock released");
                Ok(())
            },
            Err(e) => Err(e),
        }
    }

    /// Address currently recorded under `key`, if any.
    pub async fn holder(&self, key: &str) -> CoordinationResult<Option<String>> {
        self.store.get(key).await
    }

    /// Refresh the lease behind `guard` for another full TTL.
    pub async fn keep_alive(&self, guard: &LockGuard) -> CoordinationResult<()> {
        self.store.keep_alive(guard.lease_id).await
    }

    async fn discard_lease(&self, lease_id: LeaseId) {
        if let Err(e) = self.store.revoke_lease(lease_id).await {
            warn!(lease_id, error = %e, "Failed to revoke unused lease");
        }
    }
}

impl fmt::Debug for CoordinationLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinationLock")
            .field("store", &self.store.name())
            .finish()
    }
}
