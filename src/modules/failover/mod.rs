//! Failover module.
//!
//! Leader election between balancer instances. Every instance runs a
//! [`FailoverController`] that repeatedly tries to take the active slot
//! through the [`CoordinationLock`](crate::modules::coordination::CoordinationLock):
//!
//! - slot taken by a healthy instance: stand by and poll
//! - slot taken by an unresponsive instance: retry quickly, so the slot is
//!   won soon after the stale lease lapses
//! - store unreachable: back off exponentially with jitter
//! - slot won: bind the public listener and become active
//!
//! Active is terminal. The controller never deletes another instance's
//! record; lease expiry is the only way a crashed holder loses the slot.

pub mod backoff;
pub mod config;
pub mod controller;
pub mod error;
pub mod status;

pub use backoff::ExponentialBackoff;
pub use config::ElectionConfig;
pub use controller::{keep_lease_alive, Candidacy, Elected, FailoverController};
pub use error::{ElectionError, ElectionResult};
pub use status::{ElectionStatus, InstanceRole, StatusSnapshot};
