//! Periodic keyspace monitor loop.

use rollcall_cache::{KeyStats, MemoryUsage, StoreMonitor};
use rollcall_config::MonitorConfig;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// One round of monitor output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorReport {
    pub key_stats: KeyStats,
    pub memory: Option<MemoryUsage>,
}

/// Runs the store monitor on a fixed interval until shutdown.
pub struct MonitorApp {
    monitor: Arc<dyn StoreMonitor>,
    config: MonitorConfig,
}

impl MonitorApp {
    /// Creates the loop around a resolved monitor.
    pub fn new(monitor: Arc<dyn StoreMonitor>, config: MonitorConfig) -> Self {
        Self { monitor, config }
    }

    /// Collects and logs one report.
    pub async fn report(&self) -> MonitorReport {
        let key_stats = self.monitor.get_key_stats().await;
        let memory = self.monitor.monitor_memory_usage().await;

        for (name, count) in &key_stats {
            info!(pattern = %name, keys = count, "Key stats");
        }
        match &memory {
            Some(memory) => info!(?memory, "Memory usage"),
            None => warn!("Memory usage unavailable"),
        }

        MonitorReport { key_stats, memory }
    }

    /// Reports immediately, then every interval, until `shutdown` resolves.
    ///
    /// Returns the number of reports produced.
    pub async fn run_until<F>(self, shutdown: F) -> usize
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        if !self.config.enabled {
            info!("Keyspace monitor disabled");
            shutdown.await;
            return 0;
        }

        let period = self.config.interval().max(Duration::from_secs(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut reports = 0;
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.report().await;
                    reports += 1;
                }
            }
        }

        info!(reports, "Keyspace monitor stopped");
        reports
    }
}
