//! Proximity ranking of backends.

use super::backend::BackendServer;
use super::geo::GeoPoint;

/// A backend paired with its distance from a requester.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedBackend {
    /// The backend.
    pub server: BackendServer,
    /// Great-circle distance from the requester, in kilometres.
    pub distance_km: f64,
}

/// Orders backends by great-circle distance from a point.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceRanker;

impl DistanceRanker {
    /// Create a new ranker.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Rank `backends` by ascending distance from `from`.
    ///
    /// The sort is stable: backends at equal distance keep their input order.
    #[must_use]
    pub fn rank(&self, backends: &[BackendServer], from: GeoPoint) -> Vec<RankedBackend> {
        let mut ranked: Vec<RankedBackend> = backends
            .iter()
            .map(|server| RankedBackend {
                distance_km: server.location().distance_km(&from),
                server: server.clone(),
            })
            .collect();

        ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        ranked
    }
}
