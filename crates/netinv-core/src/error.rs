use thiserror::Error;

/// Fatal validation errors for an inventory run.
///
/// All of these are raised before any probing starts. Per-host failures
/// (a dead probe, a garbled table row, a failed lookup) never surface here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("Invalid CIDR '{input}': expected <a.b.c.d>/<prefix>")]
    InvalidFormat { input: String },

    #[error("Refusing prefix /{prefix}: only /8 through /30 can be scanned")]
    PrefixOutOfRange { prefix: u32 },

    #[error("Refusing to scan {hosts} hosts (limit {limit}); use a smaller subnet")]
    RangeTooLarge { hosts: u64, limit: u64 },

    #[error("Active probing requires a subnet")]
    MissingSubnetForActiveScan,
}

pub type Result<T> = std::result::Result<T, InventoryError>;
