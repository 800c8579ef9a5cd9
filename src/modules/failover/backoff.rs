//! Bounded exponential backoff with jitter.

use super::config::ElectionConfig;
use rand::RngExt;
use std::time::Duration;

/// Exponential backoff.
///
/// Each call to [`next_delay`](Self::next_delay) grows the base delay by the
/// multiplier up to the maximum, then spreads it by a random factor in
/// `[1 - jitter, 1 + jitter]`. The returned delay never exceeds the maximum.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    jitter: f64,
    current: Duration,
    attempts: u32,
}

impl ExponentialBackoff {
    /// Create a backoff.
    #[must_use]
    pub fn new(initial: Duration, max: Duration, multiplier: f64, jitter: f64) -> Self {
        let max = max.max(initial);
        Self {
            initial,
            max,
            multiplier: multiplier.max(1.0),
            jitter: jitter.clamp(0.0, 1.0),
            current: initial,
            attempts: 0,
        }
    }

    /// Create a backoff from election configuration.
    #[must_use]
    pub fn from_config(config: &ElectionConfig) -> Self {
        Self::new(
            config.backoff_initial,
            config.backoff_max,
            config.backoff_multiplier,
            config.jitter,
        )
    }

    /// Delay to wait before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current;
        self.attempts = self.attempts.saturating_add(1);
        self.current = self.scaled(self.current, self.multiplier);

        if self.jitter == 0.0 {
            return base;
        }

        let factor = rand::rng().random_range(1.0 - self.jitter..=1.0 + self.jitter);
        self.scaled(base, factor)
    }

    /// `delay * factor`, capped at the maximum instead of overflowing.
    fn scaled(&self, delay: Duration, factor: f64) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * factor)
            .map_or(self.max, |d| d.min(self.max))
    }

    /// Start over from the initial delay.
    pub fn reset(&mut self) {
        self.current = self.initial;
        self.attempts = 0;
    }

    /// Number of delays handed out since the last reset.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grows_and_caps_without_jitter() {
        let mut backoff = ExponentialBackoff::new(
            Duration::from_millis(100),
            Duration::from_millis(500),
            2.0,
            0.0,
        );

        let delays: Vec<_> = (0..5).map(|_| backoff.next_delay()).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(500),
                Duration::from_millis(500),
            ]
        );
        assert_eq!(backoff.attempts(), 5);
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let mut backoff = ExponentialBackoff::new(
            Duration::from_millis(100),
            Duration::from_secs(1),
            2.0,
            0.5,
        );

        for _ in 0..50 {
            let delay = backoff.next_delay();
            assert!(delay >= Duration::from_millis(50));
            assert!(delay <= Duration::from_secs(1));
        }
    }

    #[test]
    fn test_huge_multiplier_caps_at_max() {
        for multiplier in [1e30, f64::INFINITY] {
            let mut backoff = ExponentialBackoff::new(
                Duration::from_secs(1),
                Duration::from_secs(30),
                multiplier,
                0.0,
            );

            assert_eq!(backoff.next_delay(), Duration::from_secs(1));
            assert_eq!(backoff.next_delay(), Duration::from_secs(30));
            assert_eq!(backoff.next_delay(), Duration::from_secs(30));
        }
    }

    #[test]
    fn test_jitter_near_duration_max() {
        let mut backoff = ExponentialBackoff::new(Duration::MAX, Duration::MAX, 2.0, 1.0);
        for _ in 0..10 {
            assert!(backoff.next_delay() <= Duration::MAX);
        }
    }

    #[test]
    fn test_reset() {
        let mut backoff = ExponentialBackoff::new(
            Duration::from_millis(100),
            Duration::from_secs(1),
            3.0,
            0.0,
        );
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();

        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_from_config() {
        let config = ElectionConfig {
            jitter: 0.0,
            ..ElectionConfig::default()
        };
        let mut backoff = ExponentialBackoff::from_config(&config);
        assert_eq!(backoff.next_delay(), config.backoff_initial);
    }
}
