//! In-process coordination store.
//!
//! Implements the same lease and conditional-write semantics as the etcd
//! store, with expiry checked against a monotonic clock on every operation.
//! Useful for single-node deployments and tests where several controllers
//! share one store.

use super::error::{CoordinationError, CoordinationResult};
use super::store::{CoordinationStore, LeaseId, StoreFuture};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct LeaseEntry {
    ttl: Duration,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
struct KeyEntry {
    value: String,
    lease: LeaseId,
}

#[derive(Debug, Default)]
struct State {
    leases: HashMap<LeaseId, LeaseEntry>,
    keys: HashMap<String, KeyEntry>,
    next_lease: LeaseId,
}

impl State {
    /// Drop expired leases and every key bound to them.
    fn purge_expired(&mut self, now: Instant) {
        let expired: Vec<LeaseId> = self
            .leases
            .iter()
            .filter(|(_, lease)| lease.expires_at <= now)
            .map(|(id, _)| *id)
            .collect();

        for id in expired {
            self.remove_lease(id);
        }
    }

    fn remove_lease(&mut self, id: LeaseId) -> bool {
        let existed = self.leases.remove(&id).is_some();
        self.keys.retain(|_, entry| entry.lease != id);
        existed
    }
}

/// Local in-memory lease store.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
    /// When false every operation fails with a connectivity error.
    available: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_lease: 1,
                ..State::default()
            }),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the store becoming reachable or unreachable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Whether the store is currently reachable.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Number of live leases.
    #[must_use]
    pub fn lease_count(&self) -> usize {
        self.state
            .lock()
            .map(|mut state| {
                state.purge_expired(Instant::now());
                state.leases.len()
            })
            .unwrap_or(0)
    }

    /// Lease bound to `key`, if the key exists.
    #[must_use]
    pub fn lease_of(&self, key: &str) -> Option<LeaseId> {
        let mut state = self.state.lock().ok()?;
        state.purge_expired(Instant::now());
        state.keys.get(key).map(|entry| entry.lease)
    }

    /// Run `op` against the live state, or fail if the store is unavailable.
    fn with_state<T>(
        &self,
        op: impl FnOnce(&mut State) -> CoordinationResult<T>,
    ) -> CoordinationResult<T> {
        if !self.is_available() {
            return Err(CoordinationError::Connectivity(
                "memory store unavailable".to_string(),
            ));
        }

        let mut state = self
            .state
            .lock()
            .map_err(|_| CoordinationError::Store("memory store lock poisoned".to_string()))?;
        state.purge_expired(Instant::now());
        op(&mut state)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CoordinationStore for MemoryStore {
    fn grant_lease(&self, ttl: Duration) -> StoreFuture<'_, LeaseId> {
        let result = self.with_state(|state| {
            let id = state.next_lease;
            state.next_lease += 1;
            state.leases.insert(
                id,
                LeaseEntry {
                    ttl,
                    expires_at: Instant::now() + ttl,
                },
            );
            Ok(id)
        });
        Box::pin(std::future::ready(result))
    }

    fn put_if_absent<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        lease: LeaseId,
    ) -> StoreFuture<'a, bool> {
        let result = self.with_state(|state| {
            if !state.leases.contains_key(&lease) {
                return Err(CoordinationError::LeaseNotFound(lease));
            }
            if state.keys.contains_key(key) {
                return Ok(false);
            }
            state.keys.insert(
                key.to_string(),
                KeyEntry {
                    value: value.to_string(),
                    lease,
                },
            );
            Ok(true)
        });
        Box::pin(std::future::ready(result))
    }

    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
        let result = self.with_state(|state| Ok(state.keys.get(key).map(|e| e.value.clone())));
        Box::pin(std::future::ready(result))
    }

    fn delete_owned<'a>(&'a self, key: &'a str, lease: LeaseId) -> StoreFuture<'a, bool> {
        let result = self.with_state(|state| {
            let owned = state.keys.get(key).is_some_and(|entry| entry.lease == lease);
            if owned {
                state.keys.remove(key);
            }
            Ok(owned)
        });
        Box::pin(std::future::ready(result))
    }

    fn revoke_lease(&self, lease: LeaseId) -> StoreFuture<'_, ()> {
        let result = self.with_state(|state| {
            if state.remove_lease(lease) {
                Ok(())
            } else {
                Err(CoordinationError::LeaseNotFound(lease))
            }
        });
        Box::pin(std::future::ready(result))
    }

    fn keep_alive(&self, lease: LeaseId) -> StoreFuture<'_, ()> {
        let result = self.with_state(|state| match state.leases.get_mut(&lease) {
            Some(entry) => {
                entry.expires_at = Instant::now() + entry.ttl;
                Ok(())
            },
            None => Err(CoordinationError::LeaseNotFound(lease)),
        });
        Box::pin(std::future::ready(result))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
