//! CLI entry point for the netinv LAN inventory tool.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use netinv_core::Subnet;
use netinv_discover::config::DiscoverConfig;
use netinv_discover::output::{self, OutputFormat};
use netinv_discover::{DiscoverOptions, DiscoveryEngine};

#[derive(Parser)]
#[command(name = "netinv")]
#[command(about = "Authorized LAN inventory: neighbor tables, optional ping sweep and reverse DNS")]
struct Cli {
    /// IPv4 CIDR to sweep (e.g., 192.168.1.0/24). Required with --active.
    #[arg(short, long)]
    subnet: Option<String>,

    /// Opt-in ping sweep across --subnet.
    #[arg(long)]
    active: bool,

    /// Best-effort reverse DNS for every discovered host.
    #[arg(long)]
    dns: bool,

    /// Per-probe timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Maximum concurrent probes (at least 1).
    #[arg(long)]
    workers: Option<usize>,

    /// Report path.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Report format.
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Config file prefix (default: netinv).
    #[arg(short, long, default_value = "netinv")]
    config: String,

    /// Emit logs as JSON.
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.log_json {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    }

    let mut config = DiscoverConfig::load(&cli.config)?;
    if let Some(ms) = cli.timeout_ms {
        config.probe_timeout_ms = ms;
    }
    if let Some(workers) = cli.workers {
        config.max_concurrent_probes = workers;
    }
    if let Some(format) = cli.format {
        config.output_format = format;
    }
    let out_path = cli
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output_path));

    // Validate before touching the network.
    let subnet = cli.subnet.as_deref().map(Subnet::parse).transpose()?;

    let options = DiscoverOptions {
        active_probe: cli.active,
        resolve_dns: cli.dns,
        timeout: config.probe_timeout(),
    };

    let engine = DiscoveryEngine::from_config(&config);
    let outcome = engine.discover(subnet.as_ref(), &options).await?;

    output::write_report(&outcome.records, config.output_format, &out_path)?;
    println!(
        "Wrote {} record(s) to {}",
        outcome.records.len(),
        out_path.display()
    );

    Ok(())
}
