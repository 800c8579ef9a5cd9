//! # Load Balancer Module
//!
//! Geography-aware backend selection for the active instance.
//!
//! ## Features
//!
//! - **Static Directory**: An immutable, ordered set of backends with
//!   fixed coordinates, shared by every request without locking
//! - **Distance Ranking**: Great-circle (haversine) ordering from the
//!   requester's coordinates, stable on ties
//! - **Health Gating**: The nearest backend that accepts a TCP connection
//!   wins; unreachable backends are skipped
//! - **Forwarding**: Requests are relayed unchanged over HTTP/1.1
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │      RequestRouter       │
//! │                          │
//! │  ┌────────────────────┐  │
//! │  │ Latitude/Longitude │  │      ┌──────────┐
//! │  └────────────────────┘  │ ┌──▶│ Backend1 │
//! │            │             │ │    └──────────┘
//! │  ┌────────────────────┐  │ │    ┌──────────┐
//! │  │  DistanceRanker    │  │ │    │ Backend2 │
//! │  └────────────────────┘  │ │    └──────────┘
//! │            │             │ │
//! │  ┌────────────────────┐  │ │
//! │  │   HealthProbe      │──┼─┘
//! │  └────────────────────┘  │
//! └──────────────────────────┘
//! ```

pub mod backend;
pub mod balancer;
pub mod config;
pub mod error;
pub mod geo;
pub mod health;
pub mod proxy;
pub mod ranking;
pub mod router;
pub mod server;

pub use backend::{BackendDirectory, BackendServer};
pub use balancer::{GeoBalancer, LoadBalancerStats};
pub use config::{BackendConfig, HealthCheckConfig, RouterConfig};
pub use error::{LoadBalancerError, LoadBalancerResult};
pub use geo::{GeoPoint, EARTH_RADIUS_KM};
pub use health::{HealthProbe, TcpProbe};
pub use proxy::{HttpForwarder, ProxyBody};
pub use ranking::{DistanceRanker, RankedBackend};
pub use router::RequestRouter;
pub use server::serve;
