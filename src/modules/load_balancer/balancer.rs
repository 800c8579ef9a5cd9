//! Nearest-healthy backend selection.

use super::backend::BackendDirectory;
use super::error::{LoadBalancerError, LoadBalancerResult};
use super::geo::GeoPoint;
use super::health::HealthProbe;
use super::ranking::{DistanceRanker, RankedBackend};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Load balancer statistics.
#[derive(Debug, Default)]
pub struct LoadBalancerStats {
    /// Total selections made.
    pub total_selections: AtomicU64,
    /// Successful selections.
    pub successful_selections: AtomicU64,
    /// Failed selections (no healthy backend).
    pub failed_selections: AtomicU64,
    /// Backends skipped because their probe failed.
    pub skipped_backends: AtomicU64,
    /// Requests forwarded to a backend.
    pub forwarded_requests: AtomicU64,
    /// Forwards that failed at the transport level.
    pub failed_forwards: AtomicU64,
}

impl LoadBalancerStats {
    /// Record a selection outcome.
    pub fn record_selection(&self, success: bool) {
        self.total_selections.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_selections.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_selections.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a backend skipped during selection.
    pub fn record_skip(&self) {
        self.skipped_backends.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a forward outcome.
    pub fn record_forward(&self, success: bool) {
        self.forwarded_requests.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failed_forwards.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Selects the nearest reachable backend for a requester location.
pub struct GeoBalancer {
    /// Static backend directory.
    directory: BackendDirectory,
    /// Distance ranking.
    ranker: DistanceRanker,
    /// Reachability probe.
    probe: Arc<dyn HealthProbe>,
    /// Statistics.
    stats: Arc<LoadBalancerStats>,
    /// Set while every backend is unreachable, so the outage is logged once.
    outage: AtomicBool,
}

impl std::fmt::Debug for GeoBalancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoBalancer")
            .field("backends", &self.directory.len())
            .field("stats", &self.stats)
            .field("outage", &self.outage)
            .finish()
    }
}

impl GeoBalancer {
    /// Create a balancer over a directory.
    #[must_use]
    pub fn new(directory: BackendDirectory, probe: Arc<dyn HealthProbe>) -> Self {
        Self {
            directory,
            ranker: DistanceRanker::new(),
            probe,
            stats: Arc::new(LoadBalancerStats::default()),
            outage: AtomicBool::new(false),
        }
    }

    /// The backend directory.
    #[must_use]
    pub fn directory(&self) -> &BackendDirectory {
        &self.directory
    }

    /// Get load balancer statistics.
    #[must_use]
    pub fn stats(&self) -> &Arc<LoadBalancerStats> {
        &self.stats
    }

    /// Whether the last selection found no healthy backend.
    #[must_use]
    pub fn in_outage(&self) -> bool {
        self.outage.load(Ordering::Acquire)
    }

    /// Rank the directory against `from` and return the nearest backend that
    /// passes its health probe.
    ///
    /// # Errors
    ///
    /// Returns [`LoadBalancerError::NoHealthyBackend`] if every backend fails
    /// its probe, or [`LoadBalancerError::EmptyDirectory`] if there are no
    /// backends at all.
    pub async fn select_backend(&self, from: GeoPoint) -> LoadBalancerResult<RankedBackend> {
        if self.directory.is_empty() {
            self.stats.record_selection(false);
            return Err(LoadBalancerError::EmptyDirectory);
        }

        let ranked = self.ranker.rank(self.directory.backends(), from);
        let probed = ranked.len();

        for candidate in ranked {
            let address = candidate.server.connect_address();
            if self.probe.is_healthy(&address).await {
                self.stats.record_selection(true);
                if self.outage.swap(false, Ordering::AcqRel) {
                    info!(backend = %candidate.server, "Healthy backend available again");
                }
                debug!(
                    backend = %candidate.server,
                    distance_km = candidate.distance_km,
                    requester = %from,
                    "Selected backend"
                );
                return Ok(candidate);
            }

            self.stats.record_skip();
            debug!(backend = %candidate.server, "Skipping unreachable backend");
        }

        self.stats.record_selection(false);
        if !self.outage.swap(true, Ordering::AcqRel) {
            error!(backends = probed, "No healthy backend available");
        }
        Err(LoadBalancerError::NoHealthyBackend(probed))
    }
}
