//! Core domain types for a host inventory run.

use std::fmt;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Provenance ────────────────────────────────────────────────────

/// The evidence mechanism that established (or last upgraded) a record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SeenVia {
    /// ARP cache (`arp -a` / `arp -an`).
    Arp,
    /// Generic neighbor cache (`ip neigh`).
    Neigh,
    /// A successful reachability probe with no neighbor-table entry.
    Ping,
}

impl SeenVia {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arp => "arp",
            Self::Neigh => "neigh",
            Self::Ping => "ping",
        }
    }
}

impl fmt::Display for SeenVia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Observations ──────────────────────────────────────────────────

/// One neighbor-table row, normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborObservation {
    pub ip: Ipv4Addr,
    /// Lowercase, colon-separated. `None` for unresolved entries.
    pub mac: Option<String>,
    pub source: SeenVia,
}

// ── Records ───────────────────────────────────────────────────────

/// A reconciled host record. One per IP per run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventoryRecord {
    pub ip: Ipv4Addr,
    pub mac: Option<String>,
    pub hostname: Option<String>,
    /// `None` when active probing was not requested, or the IP was outside
    /// the probed range.
    pub reachable: Option<bool>,
    pub seen_via: SeenVia,
    pub timestamp: DateTime<Utc>,
}

impl InventoryRecord {
    pub(crate) fn from_observation(obs: &NeighborObservation, timestamp: DateTime<Utc>) -> Self {
        Self {
            ip: obs.ip,
            mac: obs.mac.clone(),
            hostname: None,
            reachable: None,
            seen_via: obs.source,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_seen_via_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SeenVia::Neigh).unwrap(), "\"neigh\"");
        assert_eq!(SeenVia::Arp.to_string(), "arp");
        assert_eq!(SeenVia::Ping.as_str(), "ping");
    }

    #[test]
    fn test_record_json_shape() {
        let record = InventoryRecord {
            ip: Ipv4Addr::new(192, 168, 1, 10),
            mac: Some("aa:bb:cc:dd:ee:ff".to_string()),
            hostname: None,
            reachable: Some(true),
            seen_via: SeenVia::Arp,
            timestamp: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["ip"], "192.168.1.10");
        assert_eq!(value["mac"], "aa:bb:cc:dd:ee:ff");
        assert!(value["hostname"].is_null());
        assert_eq!(value["reachable"], true);
        assert_eq!(value["seen_via"], "arp");
        assert_eq!(value["timestamp"], "2026-01-02T03:04:05Z");
    }
}
