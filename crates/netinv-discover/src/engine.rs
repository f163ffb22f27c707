//! Discovery run orchestration.
//!
//! A run is a single pass: neighbor table → probe sweep → neighbor table
//! again → reconcile → reverse lookups. Input validation happens before
//! anything touches the network, so a run either fails up front or
//! produces a complete snapshot.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{SubsecRound, Utc};
use netinv_core::{
    enumerate, parse_neighbor_table, InventoryError, InventoryRecord, NeighborTable, Reconciler,
    Subnet,
};
use uuid::Uuid;

use crate::adapter::{NetworkAdapter, SystemAdapter};
use crate::config::{DiscoverConfig, DEFAULT_PROBE_TIMEOUT};
use crate::error::Result;
use crate::prober::Prober;
use crate::resolver::{resolve_all, ReverseResolver, SystemResolver};

/// What a run should do beyond reading the neighbor table.
#[derive(Debug, Clone)]
pub struct DiscoverOptions {
    /// Ping every usable host of the subnet.
    pub active_probe: bool,
    /// Reverse-resolve every discovered host.
    pub resolve_dns: bool,
    /// Per-probe timeout.
    pub timeout: Duration,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        Self {
            active_probe: false,
            resolve_dns: false,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct DiscoveryReport {
    pub run_id: Uuid,
    pub subnet: Option<String>,
    pub hosts_probed: usize,
    pub hosts_reachable: usize,
    /// Neighbor-table rows rejected across both captures.
    pub skipped_rows: usize,
    pub hostnames_resolved: usize,
    pub records: usize,
    pub duration_ms: u64,
}

/// Records plus the run summary.
pub struct DiscoveryOutcome {
    pub records: Vec<InventoryRecord>,
    pub report: DiscoveryReport,
}

/// Reusable discovery engine over pluggable platform adapters.
pub struct DiscoveryEngine {
    adapter: Arc<dyn NetworkAdapter>,
    resolver: Arc<dyn ReverseResolver>,
    max_concurrent_probes: usize,
    max_concurrent_lookups: usize,
}

impl DiscoveryEngine {
    pub fn new(adapter: Arc<dyn NetworkAdapter>, resolver: Arc<dyn ReverseResolver>) -> Self {
        let defaults = DiscoverConfig::default();
        Self {
            adapter,
            resolver,
            max_concurrent_probes: defaults.max_concurrent_probes,
            max_concurrent_lookups: defaults.max_concurrent_lookups,
        }
    }

    /// Engine backed by the host OS tools, tuned from `config`.
    pub fn from_config(config: &DiscoverConfig) -> Self {
        Self::new(
            Arc::new(SystemAdapter::new(config.command_timeout())),
            Arc::new(SystemResolver::new(config.dns_timeout())),
        )
        .with_max_concurrent_probes(config.max_concurrent_probes)
        .with_max_concurrent_lookups(config.max_concurrent_lookups)
    }

    pub fn with_max_concurrent_probes(mut self, n: usize) -> Self {
        self.max_concurrent_probes = n;
        self
    }

    pub fn with_max_concurrent_lookups(mut self, n: usize) -> Self {
        self.max_concurrent_lookups = n;
        self
    }

    /// Run one discovery pass.
    ///
    /// Active probing requires `subnet`; every other failure along the way
    /// degrades to missing evidence for the affected host.
    pub async fn discover(
        &self,
        subnet: Option<&Subnet>,
        options: &DiscoverOptions,
    ) -> Result<DiscoveryOutcome> {
        let probe_subnet = match (options.active_probe, subnet) {
            (true, None) => return Err(InventoryError::MissingSubnetForActiveScan.into()),
            (true, Some(s)) => Some(s),
            (false, _) => None,
        };

        let run_id = Uuid::new_v4();
        let start = Instant::now();
        let timestamp = Utc::now().trunc_subsecs(0);

        let subnet_label = subnet.map(|s| s.to_string());

        tracing::info!(
            run_id = %run_id,
            subnet = subnet_label.as_deref().unwrap_or("-"),
            active = options.active_probe,
            dns = options.resolve_dns,
            "Starting discovery run"
        );

        let pre_scan = self.capture_neighbors("pre-probe").await;
        let mut skipped_rows = pre_scan.skipped;

        let mut reconciler = Reconciler::new(timestamp);
        reconciler.seed(&pre_scan.entries);

        let mut hosts_probed = 0;
        let mut hosts_reachable = 0;

        if let Some(subnet) = probe_subnet {
            let hosts = enumerate(subnet);
            tracing::info!(
                run_id = %run_id,
                subnet = %subnet,
                hosts = hosts.len(),
                timeout_ms = options.timeout.as_millis() as u64,
                "Probing subnet"
            );

            let probes = Prober::new(self.adapter.clone())
                .with_timeout(options.timeout)
                .with_max_concurrent(self.max_concurrent_probes)
                .sweep(&hosts)
                .await;
            hosts_probed = probes.len();
            hosts_reachable = probes.values().filter(|r| **r).count();

            // Probing populates the OS neighbor cache, so look again.
            let post_scan = self.capture_neighbors("post-probe").await;
            skipped_rows += post_scan.skipped;

            reconciler.apply_probes(&probes);
            reconciler.merge_post_scan(&post_scan.entries);
            reconciler.attach_reachability(&probes);
        }

        let mut hostnames_resolved = 0;
        if options.resolve_dns && !reconciler.is_empty() {
            let names = resolve_all(
                self.resolver.clone(),
                &reconciler.ips(),
                self.max_concurrent_lookups,
            )
            .await;
            hostnames_resolved = names.len();
            reconciler.attach_hostnames(&names);
        }

        let records = reconciler.finish();
        let report = DiscoveryReport {
            run_id,
            subnet: subnet_label,
            hosts_probed,
            hosts_reachable,
            skipped_rows,
            hostnames_resolved,
            records: records.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        };

        tracing::info!(
            run_id = %run_id,
            records = report.records,
            probed = report.hosts_probed,
            reachable = report.hosts_reachable,
            skipped_rows = report.skipped_rows,
            hostnames = report.hostnames_resolved,
            duration_ms = report.duration_ms,
            "Discovery run complete"
        );

        Ok(DiscoveryOutcome { records, report })
    }

    async fn capture_neighbors(&self, phase: &str) -> NeighborTable {
        let raw = self.adapter.neighbor_table().await;
        let table = parse_neighbor_table(&raw.text, raw.platform);

        tracing::debug!(
            phase,
            platform = ?raw.platform,
            entries = table.len(),
            skipped = table.skipped,
            "Neighbor table captured"
        );

        table
    }
}
