//! Election timing configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Election loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectionConfig {
    /// Wait before retrying while a healthy instance holds the slot.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Wait before retrying while the holder is unresponsive.
    #[serde(with = "humantime_serde")]
    pub retry_interval: Duration,

    /// Wait after releasing the slot because the listener could not bind.
    #[serde(with = "humantime_serde")]
    pub bind_retry_delay: Duration,

    /// First backoff delay after a store failure.
    #[serde(with = "humantime_serde")]
    pub backoff_initial: Duration,

    /// Upper bound for the backoff delay.
    #[serde(with = "humantime_serde")]
    pub backoff_max: Duration,

    /// Growth factor between consecutive backoff delays.
    pub backoff_multiplier: f64,

    /// Random spread applied to each backoff delay, as a fraction (0.0 - 1.0).
    pub jitter: f64,

    /// Refresh the lease while active instead of relying on the TTL alone.
    pub keep_alive: bool,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            retry_interval: Duration::from_secs(2),
            bind_retry_delay: Duration::from_secs(1),
            backoff_initial: Duration::from_millis(250),
            backoff_max: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: 0.2,
            keep_alive: false,
        }
    }
}
