//! netinv-discover: LAN host discovery on top of `netinv-core`.
//!
//! Captures the OS neighbor table, optionally ping-sweeps a subnet and
//! reverse-resolves the hosts it finds, then reconciles all of it into one
//! record per IP and writes a report.

pub mod adapter;
pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod prober;
pub mod resolver;

pub use engine::{DiscoverOptions, DiscoveryEngine, DiscoveryOutcome, DiscoveryReport};
pub use error::DiscoverError;
