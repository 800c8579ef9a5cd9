//! Observable election state.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;
use tokio::sync::watch;

/// Role of this instance in the election.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceRole {
    /// Trying to take the active slot.
    #[default]
    Contending,
    /// Another healthy instance is active; polling.
    Standby,
    /// Holding the slot and serving traffic.
    Active,
}

impl InstanceRole {
    /// Whether this instance serves traffic.
    #[must_use]
    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

impl fmt::Display for InstanceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contending => write!(f, "contending"),
            Self::Standby => write!(f, "standby"),
            Self::Active => write!(f, "active"),
        }
    }
}

/// Election state shared between the controller and observers.
///
/// Only the failover controller changes it.
#[derive(Debug)]
pub struct ElectionStatus {
    role: watch::Sender<InstanceRole>,
    consecutive_failures: AtomicU64,
    total_failures: AtomicU64,
    last_holder: Mutex<Option<String>>,
    last_transition: Mutex<Instant>,
}

/// Point-in-time copy of [`ElectionStatus`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    /// Current role.
    pub role: InstanceRole,
    /// Store failures since the last successful store call.
    pub consecutive_failures: u64,
    /// Store failures since startup.
    pub total_failures: u64,
    /// Address of the last holder observed while not active.
    pub last_holder: Option<String>,
    /// Seconds spent in the current role.
    pub role_age_secs: u64,
}

impl ElectionStatus {
    /// Create a status in the contending role.
    #[must_use]
    pub fn new() -> Self {
        let (role, _) = watch::channel(InstanceRole::Contending);
        Self {
            role,
            consecutive_failures: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            last_holder: Mutex::new(None),
            last_transition: Mutex::new(Instant::now()),
        }
    }

    /// Current role.
    #[must_use]
    pub fn role(&self) -> InstanceRole {
        *self.role.borrow()
    }

    /// Receiver notified on every role change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<InstanceRole> {
        self.role.subscribe()
    }

    /// Store failures since the last successful store call.
    #[must_use]
    pub fn consecutive_failures(&self) -> u64 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Store failures since startup.
    #[must_use]
    pub fn total_failures(&self) -> u64 {
        self.total_failures.load(Ordering::Relaxed)
    }

    /// Address of the last holder observed.
    #[must_use]
    pub fn last_holder(&self) -> Option<String> {
        self.last_holder.lock().ok().and_then(|h| h.clone())
    }

    /// Copy the current state.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        let role_age_secs = self
            .last_transition
            .lock()
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0);

        StatusSnapshot {
            role: self.role(),
            consecutive_failures: self.consecutive_failures(),
            total_failures: self.total_failures(),
            last_holder: self.last_holder(),
            role_age_secs,
        }
    }

    /// Change the role. Returns whether it actually changed.
    pub(crate) fn set_role(&self, role: InstanceRole) -> bool {
        let changed = self.role.send_if_modified(|current| {
            if *current == role {
                false
            } else {
                *current = role;
                true
            }
        });

        if changed {
            if let Ok(mut t) = self.last_transition.lock() {
                *t = Instant::now();
            }
        }
        changed
    }

    /// Count a failed store call. Returns the consecutive failure count.
    pub(crate) fn record_failure(&self) -> u64 {
        self.total_failures.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count a successful store call.
    pub(crate) fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    pub(crate) fn set_last_holder(&self, holder: Option<String>) {
        if let Ok(mut h) = self.last_holder.lock() {
            *h = holder;
        }
    }
}

impl Default for ElectionStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let status = ElectionStatus::new();
        assert_eq!(status.role(), InstanceRole::Contending);
        assert_eq!(status.consecutive_failures(), 0);
        assert_eq!(status.last_holder(), None);
    }

    #[test]
    fn test_failure_counters() {
        let status = ElectionStatus::new();
        assert_eq!(status.record_failure(), 1);
        assert_eq!(status.record_failure(), 2);
        status.record_success();
        assert_eq!(status.record_failure(), 1);

        assert_eq!(status.consecutive_failures(), 1);
        assert_eq!(status.total_failures(), 3);
    }

    #[tokio::test]
    async fn test_role_changes_notify() {
        let status = ElectionStatus::new();
        let mut rx = status.subscribe();

        assert!(!status.set_role(InstanceRole::Contending));
        assert!(status.set_role(InstanceRole::Active));

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), InstanceRole::Active);
        assert!(status.role().is_active());
    }

    #[test]
    fn test_snapshot_serializes() {
        let status = ElectionStatus::new();
        status.set_role(InstanceRole::Standby);
        status.set_last_holder(Some("10.0.0.1:8080".to_string()));

        let json = serde_json::to_value(status.snapshot()).unwrap();
        assert_eq!(json["role"], "standby");
        assert_eq!(json["last_holder"], "10.0.0.1:8080");
        assert_eq!(json["total_failures"], 0);
    }
}
