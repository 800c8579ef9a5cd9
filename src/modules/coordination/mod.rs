//! Coordination module.
//!
//! A single named mutual-exclusion slot on top of a lease-capable key-value
//! store. The slot is taken with one conditional transaction ("write the key
//! only if it has no version, bound to a fresh lease") and disappears when
//! the lease expires or the holder releases it.
//!
//! # Stores
//!
//! - [`MemoryStore`]: in-process, for single-node runs and tests
//! - `EtcdStore`: etcd cluster (cargo feature `etcd`)

pub mod config;
#[cfg(feature = "etcd")]
pub mod etcd;
pub mod error;
pub mod lock;
pub mod memory;
pub mod store;

pub use config::{CoordinationConfig, StoreBackend};
#[cfg(feature = "etcd")]
pub use etcd::EtcdStore;
pub use error::{CoordinationError, CoordinationResult};
pub use lock::{CoordinationLock, LockGuard};
pub use memory::MemoryStore;
pub use store::{CoordinationStore, LeaseId, StoreFuture};

use std::sync::Arc;

/// Build the store selected by `config`.
///
/// # Errors
///
/// Returns [`CoordinationError::Store`] if the selected backend was not
/// compiled in.
pub fn build_store(config: &CoordinationConfig) -> CoordinationResult<Arc<dyn CoordinationStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "etcd")]
        StoreBackend::Etcd => Ok(Arc::new(EtcdStore::new(config))),
        #[cfg(not(feature = "etcd"))]
        StoreBackend::Etcd => Err(CoordinationError::Store(
            "etcd backend requires the `etcd` feature".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_memory_store() {
        let store = build_store(&CoordinationConfig::default()).unwrap();
        assert_eq!(store.name(), "memory");
    }

    #[cfg(not(feature = "etcd"))]
    #[test]
    fn test_build_etcd_store_without_feature() {
        let config = CoordinationConfig {
            backend: StoreBackend::Etcd,
            ..CoordinationConfig::default()
        };
        assert!(build_store(&config).is_err());
    }
}
