//! Test data generators for benchmarks.
//!
//! Provides backend directories scattered over the globe and requester
//! locations.

use r0n_geolb::modules::load_balancer::{BackendServer, GeoPoint};
use rand::RngExt;

/// Generate a uniformly random point on the map.
pub fn random_point() -> GeoPoint {
    let mut rng = rand::rng();
    GeoPoint::new(
        rng.random_range(-90.0..=90.0),
        rng.random_range(-180.0..=180.0),
    )
}

/// Generate `count` requester locations.
pub fn requester_points(count: usize) -> Vec<GeoPoint> {
    (0..count).map(|_| random_point()).collect()
}

/// Generate a backend directory of `count` entries at random locations.
pub fn backend_servers(count: usize) -> Vec<BackendServer> {
    (0..count)
        .map(|i| {
            let address = format!("10.{}.{}.1:8080", i / 256, i % 256);
            BackendServer::new(address, random_point()).expect("generated backend is valid")
        })
        .collect()
}
