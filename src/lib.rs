//! grprov - Group Replication provisioning core
//!
//! Drives one MySQL server through the steps of joining, bootstrapping or
//! leaving a Group Replication group. The server is reached through the
//! `Instance` trait; the caller owns connections and sequencing.

pub mod cli;
pub mod config;
pub mod errors;
pub mod group_replication;
pub mod instance;
pub mod observability;
pub mod testing;
pub mod version;

pub use errors::{GrError, GrResult};
