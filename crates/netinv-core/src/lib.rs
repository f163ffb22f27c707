//! netinv-core: Discovery and reconciliation logic for LAN host inventory.
//!
//! This crate holds the pure, I/O-free parts of an inventory run:
//! - CIDR validation and host enumeration with scan-safety limits
//! - Neighbor-table (ARP / `ip neigh`) text parsing
//! - The record model handed to report writers
//! - Reconciliation of passive and active evidence into one record per IP

pub mod error;
pub mod neighbor;
pub mod reconcile;
pub mod subnet;
pub mod types;

pub use error::InventoryError;
pub use neighbor::{parse_neighbor_table, NeighborMap, NeighborTable, PlatformHint};
pub use reconcile::{reconcile, HostnameMap, ProbeResults, Reconciler};
pub use subnet::{enumerate, Subnet, MAX_SCAN_HOSTS};
pub use types::{InventoryRecord, NeighborObservation, SeenVia};
