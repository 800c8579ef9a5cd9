//! Control module.
//!
//! A small HTTP endpoint for orchestrators and operators: liveness,
//! readiness (ready only while this instance is active) and a JSON view of
//! the election and backend selection state. A standby instance that never
//! reaches the store shows up here as not ready with a growing failure
//! count.

pub mod config;
pub mod error;
pub mod server;

pub use config::ControlConfig;
pub use error::{ControlError, ControlResult};
pub use server::{ControlServer, ControlState};
