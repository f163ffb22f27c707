//! Best-effort reverse DNS.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use netinv_core::HostnameMap;
use tokio::sync::Semaphore;

#[async_trait]
pub trait ReverseResolver: Send + Sync {
    /// Resolve `ip` to a name. `None` on any failure.
    async fn lookup(&self, ip: Ipv4Addr) -> Option<String>;
}

/// Resolver backed by the system's `getnameinfo`.
pub struct SystemResolver {
    timeout: Duration,
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ReverseResolver for SystemResolver {
    async fn lookup(&self, ip: Ipv4Addr) -> Option<String> {
        // getnameinfo blocks, so it runs off the runtime under a timeout.
        let lookup = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&IpAddr::V4(ip)));

        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(Ok(name))) => clean_hostname(ip, &name),
            Ok(Ok(Err(e))) => {
                tracing::trace!(ip = %ip, error = %e, "Reverse lookup failed");
                None
            }
            Ok(Err(e)) => {
                tracing::debug!(ip = %ip, error = %e, "Reverse lookup task failed");
                None
            }
            Err(_) => {
                tracing::trace!(ip = %ip, "Reverse lookup timed out");
                None
            }
        }
    }
}

/// Drop empty names and names that merely echo the address back.
fn clean_hostname(ip: Ipv4Addr, name: &str) -> Option<String> {
    let name = name.trim().trim_end_matches('.');
    if name.is_empty() || name == ip.to_string() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Resolve every address with at most `max_concurrent` lookups in flight.
///
/// Failed lookups are simply missing from the result.
pub async fn resolve_all(
    resolver: Arc<dyn ReverseResolver>,
    ips: &[Ipv4Addr],
    max_concurrent: usize,
) -> HostnameMap {
    let semaphore = Arc::new(Semaphore::new(max_concurrent.clamp(1, Semaphore::MAX_PERMITS)));
    let mut handles = Vec::with_capacity(ips.len());

    for &ip in ips {
        let resolver = resolver.clone();
        let semaphore = semaphore.clone();

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await.ok()?;
            resolver.lookup(ip).await.map(|name| (ip, name))
        }));
    }

    let mut names = HostnameMap::new();
    for handle in handles {
        match handle.await {
            Ok(Some((ip, name))) => {
                names.insert(ip, name);
            }
            Ok(None) => {}
            Err(e) => tracing::error!(error = %e, "Reverse lookup task panicked"),
        }
    }

    tracing::debug!(
        requested = ips.len(),
        resolved = names.len(),
        "Reverse lookups complete"
    );

    names
}
