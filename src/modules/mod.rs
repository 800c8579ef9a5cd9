//! # Balancer Modules
//!
//! ## Available Modules
//!
//! - [`load_balancer`] - Distance ranking, health probing and request routing
//! - [`coordination`] - Lease-based lock over etcd or an in-process store
//! - [`failover`] - Leader election state machine
//! - [`control`] - Liveness, readiness and election status endpoint

pub mod control;
pub mod coordination;
pub mod failover;
pub mod load_balancer;
