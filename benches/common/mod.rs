#![allow(missing_docs, dead_code)]
//! Shared benchmark support: data generators and harness utilities.

pub mod generators;
pub mod harness;
