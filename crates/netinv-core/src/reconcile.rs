//! Evidence reconciliation.
//!
//! Merges the pre-probe neighbor table, probe outcomes, the post-probe
//! neighbor table and reverse lookups into one record per IP. The merge
//! order is fixed:
//!
//! 1. seed from the pre-probe table
//! 2. add reachable hosts nobody has named yet (`seen_via = ping`)
//! 3. merge the post-probe table (fill missing MACs, upgrade `ping` provenance)
//! 4. attach reachability for probed hosts
//! 5. attach hostnames
//!
//! Records are keyed and emitted by numeric address.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};

use crate::neighbor::NeighborMap;
use crate::types::{InventoryRecord, SeenVia};

/// Probe outcome for every enumerated host.
pub type ProbeResults = BTreeMap<Ipv4Addr, bool>;

/// Resolved hostnames. IPs that failed to resolve are simply absent.
pub type HostnameMap = BTreeMap<Ipv4Addr, String>;

/// Owns the in-progress record set for a single run.
pub struct Reconciler {
    records: BTreeMap<Ipv4Addr, InventoryRecord>,
    timestamp: DateTime<Utc>,
}

impl Reconciler {
    /// Start a run stamped with `timestamp`.
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            records: BTreeMap::new(),
            timestamp,
        }
    }

    /// Seed records from the pre-probe neighbor table.
    pub fn seed(&mut self, pre_scan: &NeighborMap) {
        for obs in pre_scan.values() {
            self.records
                .insert(obs.ip, InventoryRecord::from_observation(obs, self.timestamp));
        }
    }

    /// Create `ping` records for reachable hosts with no existing record.
    ///
    /// Unreachable hosts without other evidence never become records.
    pub fn apply_probes(&mut self, probes: &ProbeResults) {
        let timestamp = self.timestamp;
        for (&ip, _) in probes.iter().filter(|(_, reachable)| **reachable) {
            self.records.entry(ip).or_insert_with(|| InventoryRecord {
                ip,
                mac: None,
                hostname: None,
                reachable: Some(true),
                seen_via: SeenVia::Ping,
                timestamp,
            });
        }
    }

    /// Merge the post-probe neighbor table.
    ///
    /// A post-scan MAC only fills a gap; the first MAC seen for an IP wins.
    /// Records that exist purely because of a probe take the provenance of
    /// the table that later named them.
    pub fn merge_post_scan(&mut self, post_scan: &NeighborMap) {
        for obs in post_scan.values() {
            match self.records.entry(obs.ip) {
                Entry::Vacant(slot) => {
                    slot.insert(InventoryRecord::from_observation(obs, self.timestamp));
                }
                Entry::Occupied(mut slot) => {
                    let record = slot.get_mut();
                    if record.mac.is_none() && obs.mac.is_some() {
                        record.mac = obs.mac.clone();
                    }
                    if record.seen_via == SeenVia::Ping {
                        record.seen_via = obs.source;
                    }
                }
            }
        }
    }

    /// Attach reachability to every record whose IP was probed.
    pub fn attach_reachability(&mut self, probes: &ProbeResults) {
        for record in self.records.values_mut() {
            if let Some(&reachable) = probes.get(&record.ip) {
                record.reachable = Some(reachable);
            }
        }
    }

    /// Attach non-empty hostnames.
    pub fn attach_hostnames(&mut self, hostnames: &HostnameMap) {
        for record in self.records.values_mut() {
            if let Some(name) = hostnames.get(&record.ip).filter(|n| !n.trim().is_empty()) {
                record.hostname = Some(name.clone());
            }
        }
    }

    /// IPs that currently have a record, ascending.
    pub fn ips(&self) -> Vec<Ipv4Addr> {
        self.records.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Finish the run: every record carries the run timestamp, sorted by address.
    pub fn finish(self) -> Vec<InventoryRecord> {
        let timestamp = self.timestamp;
        self.records
            .into_values()
            .map(|mut record| {
                record.timestamp = timestamp;
                record
            })
            .collect()
    }
}

/// One-shot reconciliation of all evidence gathered in a run.
///
/// `probe_results` is `None` when active probing was not requested, in
/// which case no record carries reachability.
pub fn reconcile(
    pre_scan: &NeighborMap,
    probe_results: Option<&ProbeResults>,
    post_scan: Option<&NeighborMap>,
    hostnames: Option<&HostnameMap>,
    timestamp: DateTime<Utc>,
) -> Vec<InventoryRecord> {
    let mut reconciler = Reconciler::new(timestamp);
    reconciler.seed(pre_scan);

    if let Some(probes) = probe_results {
        reconciler.apply_probes(probes);
    }
    if let Some(post) = post_scan {
        reconciler.merge_post_scan(post);
    }
    if let Some(probes) = probe_results {
        reconciler.attach_reachability(probes);
    }
    if let Some(names) = hostnames {
        reconciler.attach_hostnames(names);
    }

    tracing::debug!(
        pre_scan = pre_scan.len(),
        post_scan = post_scan.map_or(0, |p| p.len()),
        probed = probe_results.map_or(0, |p| p.len()),
        records = reconciler.len(),
        "Evidence reconciled"
    );

    reconciler.finish()
}
