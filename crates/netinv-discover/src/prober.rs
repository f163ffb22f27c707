//! Bounded-concurrency reachability sweep.
//!
//! One tokio task per host, gated by a semaphore so at most
//! `max_concurrent` probes are in flight. Every probe is cut off at its
//! timeout plus a short grace period, whatever the adapter does; a failed,
//! stalled or panicked probe only affects its own host.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use netinv_core::ProbeResults;
use tokio::sync::Semaphore;

use crate::adapter::{NetworkAdapter, PROBE_GRACE};
use crate::config::DEFAULT_PROBE_TIMEOUT;

pub struct Prober {
    adapter: Arc<dyn NetworkAdapter>,
    timeout: Duration,
    max_concurrent: usize,
}

impl Prober {
    pub fn new(adapter: Arc<dyn NetworkAdapter>) -> Self {
        Self {
            adapter,
            timeout: DEFAULT_PROBE_TIMEOUT,
            max_concurrent: 64,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.clamp(1, Semaphore::MAX_PERMITS);
        self
    }

    /// Probe a single address.
    pub async fn probe(&self, ip: Ipv4Addr) -> bool {
        probe_within(self.adapter.as_ref(), ip, self.timeout).await
    }

    /// Probe every host and return the outcome for each one.
    ///
    /// Only returns once every probe has finished.
    pub async fn sweep(&self, hosts: &[Ipv4Addr]) -> ProbeResults {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(hosts.len());

        for &ip in hosts {
            let adapter = self.adapter.clone();
            let semaphore = semaphore.clone();
            let timeout = self.timeout;

            let handle = tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return false;
                };
                probe_within(adapter.as_ref(), ip, timeout).await
            });
            handles.push((ip, handle));
        }

        let mut results = ProbeResults::new();
        for (ip, handle) in handles {
            let reachable = match handle.await {
                Ok(reachable) => reachable,
                Err(e) => {
                    tracing::error!(ip = %ip, error = %e, "Probe task panicked");
                    false
                }
            };
            results.insert(ip, reachable);
        }

        tracing::debug!(
            probed = results.len(),
            reachable = results.values().filter(|r| **r).count(),
            "Probe sweep complete"
        );

        results
    }
}

async fn probe_within(adapter: &dyn NetworkAdapter, ip: Ipv4Addr, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout + PROBE_GRACE, adapter.probe(ip, timeout)).await {
        Ok(reachable) => reachable,
        Err(_) => {
            tracing::trace!(
                ip = %ip,
                timeout_ms = timeout.as_millis() as u64,
                "Probe timed out"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::adapter::NeighborText;
    use netinv_core::PlatformHint;

    /// Answers for a fixed set of hosts and tracks peak concurrency.
    struct CountingAdapter {
        alive: HashSet<Ipv4Addr>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl CountingAdapter {
        fn new(alive: &[Ipv4Addr]) -> Self {
            Self {
                alive: alive.iter().copied().collect(),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl NetworkAdapter for CountingAdapter {
        async fn neighbor_table(&self) -> NeighborText {
            NeighborText {
                text: String::new(),
                platform: PlatformHint::LinuxNeigh,
            }
        }

        async fn probe(&self, ip: Ipv4Addr, _timeout: Duration) -> bool {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.alive.contains(&ip)
        }
    }

    /// Never answers for `stuck`; records the timeout it was handed.
    struct StallingAdapter {
        stuck: Ipv4Addr,
        timeouts: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl NetworkAdapter for StallingAdapter {
        async fn neighbor_table(&self) -> NeighborText {
            NeighborText {
                text: String::new(),
                platform: PlatformHint::LinuxNeigh,
            }
        }

        async fn probe(&self, ip: Ipv4Addr, timeout: Duration) -> bool {
            self.timeouts.lock().unwrap().push(timeout);
            if ip == self.stuck {
                std::future::pending::<()>().await;
            }
            true
        }
    }

    fn hosts(n: u8) -> Vec<Ipv4Addr> {
        (1..=n).map(|i| Ipv4Addr::new(10, 0, 0, i)).collect()
    }

    #[tokio::test]
    async fn test_sweep_reports_every_host() {
        let alive = [Ipv4Addr::new(10, 0, 0, 2), Ipv4Addr::new(10, 0, 0, 5)];
        let prober = Prober::new(Arc::new(CountingAdapter::new(&alive)));
        let results = prober.sweep(&hosts(6)).await;

        assert_eq!(results.len(), 6);
        assert_eq!(results.values().filter(|r| **r).count(), 2);
        assert!(results[&Ipv4Addr::new(10, 0, 0, 2)]);
        assert!(!results[&Ipv4Addr::new(10, 0, 0, 3)]);
    }

    #[tokio::test]
    async fn test_sweep_respects_concurrency_limit() {
        let adapter = Arc::new(CountingAdapter::new(&[]));
        let prober = Prober::new(adapter.clone()).with_max_concurrent(3);
        let results = prober.sweep(&hosts(20)).await;

        assert_eq!(results.len(), 20);
        assert!(adapter.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_clamped() {
        let prober = Prober::new(Arc::new(CountingAdapter::new(&[]))).with_max_concurrent(0);
        let results = prober.sweep(&hosts(2)).await;
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_single_probe() {
        let alive = [Ipv4Addr::new(10, 0, 0, 1)];
        let prober = Prober::new(Arc::new(CountingAdapter::new(&alive)));
        assert!(prober.probe(Ipv4Addr::new(10, 0, 0, 1)).await);
        assert!(!prober.probe(Ipv4Addr::new(10, 0, 0, 9)).await);
    }

    #[tokio::test]
    async fn test_stalled_probe_does_not_block_sweep() {
        let adapter = Arc::new(StallingAdapter {
            stuck: Ipv4Addr::new(10, 0, 0, 1),
            timeouts: Mutex::new(Vec::new()),
        });
        let prober = Prober::new(adapter.clone())
            .with_timeout(Duration::from_millis(50))
            .with_max_concurrent(1);

        let results = tokio::time::timeout(Duration::from_secs(3), prober.sweep(&hosts(2)))
            .await
            .expect("sweep must finish despite a stalled probe");

        assert!(!results[&Ipv4Addr::new(10, 0, 0, 1)]);
        assert!(results[&Ipv4Addr::new(10, 0, 0, 2)]);
        assert_eq!(
            *adapter.timeouts.lock().unwrap(),
            vec![Duration::from_millis(50); 2]
        );
    }

    #[tokio::test]
    async fn test_default_timeout_reaches_adapter() {
        let adapter = Arc::new(StallingAdapter {
            stuck: Ipv4Addr::new(10, 9, 9, 9),
            timeouts: Mutex::new(Vec::new()),
        });
        let prober = Prober::new(adapter.clone());
        assert!(prober.probe(Ipv4Addr::new(10, 0, 0, 1)).await);
        assert_eq!(
            *adapter.timeouts.lock().unwrap(),
            vec![Duration::from_millis(750)]
        );
    }

    #[tokio::test]
    async fn test_oversized_concurrency_is_clamped() {
        let prober =
            Prober::new(Arc::new(CountingAdapter::new(&[]))).with_max_concurrent(usize::MAX);
        let results = prober.sweep(&hosts(2)).await;
        assert_eq!(results.len(), 2);
    }
}
