//! The lease-capable key-value store the lock is built on.

use super::error::CoordinationResult;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Identifier of a lease granted by the store.
pub type LeaseId = i64;

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = CoordinationResult<T>> + Send + 'a>>;

/// Operations the coordination lock needs from a store.
///
/// Keys written with a lease disappear when the lease expires or is revoked.
pub trait CoordinationStore: Send + Sync {
    /// Grant a lease that expires after `ttl` unless kept alive.
    fn grant_lease(&self, ttl: Duration) -> StoreFuture<'_, LeaseId>;

    /// Atomically write `value` under `key`, bound to `lease`, only if `key`
    /// currently has no version. Returns whether the write happened.
    fn put_if_absent<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        lease: LeaseId,
    ) -> StoreFuture<'a, bool>;

    /// Read the current value of `key`.
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

    /// Atomically delete `key` only if it is still bound to `lease`.
    /// Returns whether the key was deleted; a missing key or one written
    /// under another lease is left alone.
    fn delete_owned<'a>(&'a self, key: &'a str, lease: LeaseId) -> StoreFuture<'a, bool>;

    /// Revoke `lease`, removing every key bound to it.
    fn revoke_lease(&self, lease: LeaseId) -> StoreFuture<'_, ()>;

    /// Refresh `lease` for another full TTL.
    fn keep_alive(&self, lease: LeaseId) -> StoreFuture<'_, ()>;

    /// Short name for logging.
    fn name(&self) -> &'static str;
}
