//! # R0N GeoLB
//!
//! A self-electing, geography-aware HTTP load balancer.
//!
//! ## Features
//!
//! - Leader election over a lease-based lock (etcd or in-process)
//! - Automatic failover when the active instance stops responding
//! - Nearest-healthy backend selection by great-circle distance
//! - Transparent HTTP/1.1 forwarding
//! - Liveness, readiness and election status endpoint
//!
//! ## Architecture
//!
//! Every instance runs the same binary. A
//! [`FailoverController`](modules::failover::FailoverController) contends for
//! a single slot in the coordination store; the winner binds the public
//! listener and routes each request through the
//! [`RequestRouter`](modules::load_balancer::RequestRouter). The others
//! stand by, probing the winner, and take over once its lease lapses.
//!
//! [`gateway::Gateway`] wires the pieces together from a
//! [`config::GeoLbConfig`].

pub mod config;
pub mod gateway;
pub mod logging;
pub mod modules;
