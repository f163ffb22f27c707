//! Platform adapters: neighbor-table capture and reachability probes.
//!
//! The discovery engine only needs two capabilities from the host OS, so
//! they sit behind [`NetworkAdapter`]. [`SystemAdapter`] implements them by
//! spawning the platform's `ip` / `arp` / `ping` tools through
//! `tokio::process::Command`. Every failure (missing tool, permission
//! error, timeout) degrades to "no evidence" instead of an error.

use std::net::Ipv4Addr;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use netinv_core::PlatformHint;
use tokio::process::Command;

/// Extra time granted to `ping` beyond its own timeout before it is killed.
pub(crate) const PROBE_GRACE: Duration = Duration::from_millis(500);

/// Raw neighbor-table text and the dialect it was captured in.
#[derive(Debug, Clone)]
pub struct NeighborText {
    pub text: String,
    pub platform: PlatformHint,
}

/// The two OS capabilities a discovery run depends on.
#[async_trait]
pub trait NetworkAdapter: Send + Sync {
    /// Capture the current neighbor table. Empty text when unavailable.
    async fn neighbor_table(&self) -> NeighborText;

    /// Probe one address. `true` only if it answered within `timeout`.
    async fn probe(&self, ip: Ipv4Addr, timeout: Duration) -> bool;
}

/// Adapter backed by the platform's own networking tools.
pub struct SystemAdapter {
    platform: PlatformHint,
    command_timeout: Duration,
}

impl SystemAdapter {
    pub fn new(command_timeout: Duration) -> Self {
        Self {
            platform: PlatformHint::current(),
            command_timeout,
        }
    }

    /// Run a command and return its stdout, or `None` on any failure.
    async fn capture(&self, program: &str, args: &[&str]) -> Option<String> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.command_timeout, child).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                if !output.status.success() && stdout.trim().is_empty() {
                    tracing::debug!(
                        program,
                        code = output.status.code().unwrap_or(-1),
                        "Neighbor command failed"
                    );
                    return None;
                }
                Some(stdout)
            }
            Ok(Err(e)) => {
                tracing::debug!(program, error = %e, "Neighbor command unavailable");
                None
            }
            Err(_) => {
                tracing::debug!(
                    program,
                    timeout_ms = self.command_timeout.as_millis() as u64,
                    "Neighbor command timed out"
                );
                None
            }
        }
    }
}

#[async_trait]
impl NetworkAdapter for SystemAdapter {
    async fn neighbor_table(&self) -> NeighborText {
        match self.platform {
            PlatformHint::WindowsArp => NeighborText {
                text: self.capture("arp", &["-a"]).await.unwrap_or_default(),
                platform: PlatformHint::WindowsArp,
            },
            PlatformHint::LinuxNeigh => {
                if let Some(text) = self
                    .capture("ip", &["neigh"])
                    .await
                    .filter(|t| !t.trim().is_empty())
                {
                    return NeighborText {
                        text,
                        platform: PlatformHint::LinuxNeigh,
                    };
                }
                // Minimal images ship net-tools `arp` without iproute2.
                NeighborText {
                    text: self.capture("arp", &["-an"]).await.unwrap_or_default(),
                    platform: PlatformHint::BsdArp,
                }
            }
            PlatformHint::BsdArp => NeighborText {
                text: self.capture("arp", &["-an"]).await.unwrap_or_default(),
                platform: PlatformHint::BsdArp,
            },
        }
    }

    async fn probe(&self, ip: Ipv4Addr, timeout: Duration) -> bool {
        let args = ping_args(self.platform, ip, timeout);
        let child = Command::new("ping")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(timeout + PROBE_GRACE, child).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                tracing::debug!(ip = %ip, error = %e, "Probe could not start");
                false
            }
            Err(_) => {
                tracing::trace!(ip = %ip, "Probe overran its timeout");
                false
            }
        }
    }
}

/// Arguments for a single ICMP echo with the given timeout.
///
/// Linux `ping -W` takes whole seconds; BSD/macOS `-W` and Windows `-w`
/// take milliseconds.
pub fn ping_args(platform: PlatformHint, ip: Ipv4Addr, timeout: Duration) -> Vec<String> {
    let ms = timeout.as_millis().max(1);
    match platform {
        PlatformHint::WindowsArp => vec![
            "-n".into(),
            "1".into(),
            "-w".into(),
            ms.to_string(),
            ip.to_string(),
        ],
        PlatformHint::LinuxNeigh => {
            let secs = ((ms + 500) / 1000).max(1);
            vec![
                "-c".into(),
                "1".into(),
                "-W".into(),
                secs.to_string(),
                ip.to_string(),
            ]
        }
        PlatformHint::BsdArp => vec![
            "-c".into(),
            "1".into(),
            "-W".into(),
            ms.to_string(),
            ip.to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 10);

    #[test]
    fn test_ping_args_linux_rounds_to_seconds() {
        assert_eq!(
            ping_args(PlatformHint::LinuxNeigh, HOST, Duration::from_millis(750)),
            vec!["-c", "1", "-W", "1", "192.168.1.10"]
        );
        assert_eq!(
            ping_args(PlatformHint::LinuxNeigh, HOST, Duration::from_millis(100)),
            vec!["-c", "1", "-W", "1", "192.168.1.10"]
        );
        assert_eq!(
            ping_args(PlatformHint::LinuxNeigh, HOST, Duration::from_millis(2600)),
            vec!["-c", "1", "-W", "3", "192.168.1.10"]
        );
    }

    #[test]
    fn test_ping_args_millisecond_platforms() {
        assert_eq!(
            ping_args(PlatformHint::WindowsArp, HOST, Duration::from_millis(750)),
            vec!["-n", "1", "-w", "750", "192.168.1.10"]
        );
        assert_eq!(
            ping_args(PlatformHint::BsdArp, HOST, Duration::from_millis(750)),
            vec!["-c", "1", "-W", "750", "192.168.1.10"]
        );
    }

    #[tokio::test]
    async fn test_missing_tool_yields_no_evidence() {
        let adapter = SystemAdapter::new(Duration::from_secs(1));
        let output = adapter
            .capture("netinv-definitely-not-a-real-tool", &[])
            .await;
        assert!(output.is_none());
    }
}
