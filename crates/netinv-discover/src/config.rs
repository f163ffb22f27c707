//! Configuration for the netinv discovery run.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{DiscoverError, Result};
use crate::output::OutputFormat;

/// Default per-probe timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(750);

/// Top-level discover configuration.
///
/// Loaded from `netinv.toml` `[discover]` section or
/// `NETINV_DISCOVER__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverConfig {
    /// Reachability probe timeout in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Maximum probes in flight at once.
    #[serde(default = "default_max_concurrent_probes")]
    pub max_concurrent_probes: usize,

    /// Reverse lookup timeout in milliseconds.
    #[serde(default = "default_dns_timeout_ms")]
    pub dns_timeout_ms: u64,

    /// Maximum reverse lookups in flight at once.
    #[serde(default = "default_max_concurrent_lookups")]
    pub max_concurrent_lookups: usize,

    /// Upper bound on each neighbor-table command.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    /// Report format.
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Report destination.
    #[serde(default = "default_output_path")]
    pub output_path: String,
}

impl DiscoverConfig {
    /// Layer `<file_prefix>.toml` (optional) under `NETINV_DISCOVER__*`
    /// environment variables.
    ///
    /// A source that cannot be read or parsed is an error. A missing or
    /// unusable `[discover]` section falls back to defaults.
    pub fn load(file_prefix: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("NETINV")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| DiscoverError::Config(e.to_string()))?;

        match cfg.get::<DiscoverConfig>("discover") {
            Ok(c) => Ok(c),
            Err(e) => {
                tracing::debug!(error = %e, "No usable [discover] config, using defaults");
                Ok(DiscoverConfig::default())
            }
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

fn default_probe_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT.as_millis() as u64
}

fn default_max_concurrent_probes() -> usize {
    64
}

fn default_dns_timeout_ms() -> u64 {
    2000
}

fn default_max_concurrent_lookups() -> usize {
    10
}

fn default_command_timeout_ms() -> u64 {
    5000
}

fn default_output_path() -> String {
    "inventory.jsonl".to_string()
}

impl Default for DiscoverConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout_ms(),
            max_concurrent_probes: default_max_concurrent_probes(),
            dns_timeout_ms: default_dns_timeout_ms(),
            max_concurrent_lookups: default_max_concurrent_lookups(),
            command_timeout_ms: default_command_timeout_ms(),
            output_format: OutputFormat::default(),
            output_path: default_output_path(),
        }
    }
}
