//! Keyspace monitor.
//!
//! Counts keys per configured pattern with cursor scans and extracts memory
//! figures from the store's `INFO memory` report. Both operations are
//! diagnostic: store failures are logged and degrade to empty results.

use crate::metrics::CacheMetrics;
use async_trait::async_trait;
use rollcall_config::{KeyPatternConfig, MonitorConfig};
use rollcall_core::{Interface, RollcallResult};
use rollcall_store::{KeyValueStore, SCAN_START};
use shaku::Component;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error};

/// COUNT hint for each SCAN call.
pub const DEFAULT_SCAN_COUNT: usize = 100;

/// Memory fields reported when none are configured.
pub const DEFAULT_MEMORY_FIELDS: [&str; 3] = ["used_memory", "used_memory_peak", "used_memory_lua"];

/// Key count per pattern name.
pub type KeyStats = BTreeMap<String, u64>;

/// Memory figures per INFO field.
pub type MemoryUsage = BTreeMap<String, i64>;

/// Read-only diagnostics over the backing store.
#[async_trait]
pub trait StoreMonitor: Interface + Send + Sync {
    /// Approximate number of keys matching each configured pattern.
    ///
    /// Empty if any scan failed.
    async fn get_key_stats(&self) -> KeyStats;

    /// Requested memory fields from the store, or `None` if it could not be read.
    async fn monitor_memory_usage(&self) -> Option<MemoryUsage>;
}

fn default_patterns() -> Vec<KeyPatternConfig> {
    MonitorConfig::default().patterns
}

fn default_memory_fields() -> Vec<String> {
    DEFAULT_MEMORY_FIELDS.iter().map(ToString::to_string).collect()
}

/// Store monitor backed by [`KeyValueStore::scan`] and [`KeyValueStore::info_memory`].
#[derive(Component)]
#[shaku(interface = StoreMonitor)]
pub struct KeyspaceMonitor {
    #[shaku(inject)]
    store: Arc<dyn KeyValueStore>,
    #[shaku(default = default_patterns())]
    patterns: Vec<KeyPatternConfig>,
    #[shaku(default = DEFAULT_SCAN_COUNT)]
    scan_count: usize,
    #[shaku(default = default_memory_fields())]
    memory_fields: Vec<String>,
}

impl KeyspaceMonitor {
    /// Creates a monitor from its configuration.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, config: &MonitorConfig) -> Self {
        Self {
            store,
            patterns: config.patterns.clone(),
            scan_count: config.scan_count.max(1),
            memory_fields: config.memory_fields.clone(),
        }
    }

    /// Counts keys matching `pattern`, walking the cursor until it wraps.
    ///
    /// Keys returned more than once by the store are counted more than once.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if any scan call failed.
    pub async fn count_keys(&self, pattern: &str) -> RollcallResult<u64> {
        let mut cursor = SCAN_START;
        let mut total = 0u64;

        loop {
            let (next, keys) = self.store.scan(cursor, pattern, self.scan_count).await?;
            total += keys.len() as u64;
            cursor = next;
            if cursor == SCAN_START {
                break;
            }
        }

        Ok(total)
    }

    async fn collect_key_stats(&self) -> RollcallResult<KeyStats> {
        let mut stats = KeyStats::new();
        for KeyPatternConfig { name, pattern } in &self.patterns {
            let count = self.count_keys(pattern).await?;
            stats.insert(name.clone(), count);
        }
        Ok(stats)
    }
}

#[async_trait]
impl StoreMonitor for KeyspaceMonitor {
    async fn get_key_stats(&self) -> KeyStats {
        match self.collect_key_stats().await {
            Ok(stats) => {
                for (name, count) in &stats {
                    CacheMetrics::key_count(name, *count);
                }
                debug!(target: "rollcall::redis", ?stats, "Collected key stats");
                stats
            }
            Err(e) => {
                error!(target: "rollcall::redis", error = %e, "Error getting key stats");
                KeyStats::new()
            }
        }
    }

    async fn monitor_memory_usage(&self) -> Option<MemoryUsage> {
        let report = match self.store.info_memory().await {
            Ok(report) => report,
            Err(e) => {
                error!(target: "rollcall::redis", error = %e, "Error monitoring memory usage");
                return None;
            }
        };

        let usage = parse_memory_section(&report, &self.memory_fields);
        for (field, bytes) in &usage {
            CacheMetrics::memory(field, *bytes);
        }
        Some(usage)
    }
}

impl std::fmt::Debug for KeyspaceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyspaceMonitor")
            .field("patterns", &self.patterns)
            .field("scan_count", &self.scan_count)
            .field("memory_fields", &self.memory_fields)
            .finish_non_exhaustive()
    }
}

/// Extracts integer `fields` from an `INFO` report.
///
/// Lines are `key:value` separated by LF or CRLF; blank lines and `#`
/// section headers are skipped. A value contributes its leading integer, so
/// `1.00M` reads as `1`; fields whose value does not start with one are left
/// out. Parsing stops once every requested field has been found.
#[must_use]
pub fn parse_memory_section(report: &str, fields: &[String]) -> MemoryUsage {
    let mut usage = MemoryUsage::new();
    if fields.is_empty() {
        return usage;
    }

    for line in report.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if !fields.iter().any(|field| field == key) {
            continue;
        }

        if let Some(parsed) = leading_integer(value) {
            usage.insert(key.to_string(), parsed);
        }
        if usage.len() == fields.len() {
            break;
        }
    }

    usage
}

/// Optional sign followed by the leading run of ASCII digits.
fn leading_integer(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let sign_len = usize::from(value.starts_with(['+', '-']));
    let digits = value[sign_len..].bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    value[..sign_len + digits].parse().ok()
}
