//! Application configuration structures.

use rollcall_core::telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Redis configuration.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Cached domains.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Keyspace monitor.
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "rollcall".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Redis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis URL.
    pub url: String,
    /// Connection pool size.
    pub pool_size: u32,
    /// Enable Redis (can be disabled for local development).
    pub enabled: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            enabled: true,
        }
    }
}

/// How `get_list` treats a point read that failed rather than missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GhostPolicy {
    /// Failed reads count as ghosts and are pruned from the index.
    #[default]
    PruneOnFailure,
    /// Only confirmed absences are pruned; failed reads are skipped but kept.
    PruneOnAbsence,
}

/// Cache configuration for all domains.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheConfig {
    /// Ghost reconciliation policy shared by every domain.
    #[serde(default)]
    pub ghost_policy: GhostPolicy,

    /// Online presence domain.
    #[serde(default = "DomainConfig::online_users")]
    pub user: DomainConfig,
}

/// Settings for one cached domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Domain name used as the key prefix (`<domain>:<id>`, `<domain>List:latest`).
    pub domain: String,
    /// Item TTL in seconds; `None` keeps items until deleted or evicted.
    #[serde(default)]
    pub ttl_secs: Option<u64>,
    /// Maximum length of the index list.
    pub limit: usize,
}

impl DomainConfig {
    /// Defaults for the online presence domain: 30 minutes, 20 entries.
    #[must_use]
    pub fn online_users() -> Self {
        Self {
            domain: "User".to_string(),
            ttl_secs: Some(1800),
            limit: 20,
        }
    }

    /// Returns the item TTL as a Duration.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self::online_users()
    }
}

/// A named key pattern counted by the keyspace monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPatternConfig {
    /// Name reported in the stats map.
    pub name: String,
    /// Glob pattern passed to SCAN MATCH.
    pub pattern: String,
}

/// Keyspace monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Run the periodic monitor loop.
    pub enabled: bool,
    /// Seconds between monitor runs.
    pub interval_secs: u64,
    /// COUNT hint for each SCAN call.
    pub scan_count: usize,
    /// Fields extracted from the memory section of INFO.
    pub memory_fields: Vec<String>,
    /// Key patterns to count.
    pub patterns: Vec<KeyPatternConfig>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
            scan_count: 100,
            memory_fields: vec![
                "used_memory".to_string(),
                "used_memory_peak".to_string(),
                "used_memory_lua".to_string(),
            ],
            patterns: vec![KeyPatternConfig {
                name: "users".to_string(),
                pattern: "User:*".to_string(),
            }],
        }
    }
}

impl MonitorConfig {
    /// Returns the monitor interval as a Duration.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log format (json, pretty).
    pub log_format: String,
    /// Record cache metrics through the `metrics` facade.
    pub metrics_enabled: bool,
    /// OTLP endpoint for span export.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    /// Trace sampling ratio (0.0 to 1.0).
    pub sampling_ratio: f64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
            otlp_endpoint: None,
            sampling_ratio: 1.0,
        }
    }
}

impl ObservabilityConfig {
    /// Builds the telemetry settings for the given service name.
    #[must_use]
    pub fn telemetry(&self, service_name: &str) -> TelemetryConfig {
        TelemetryConfig {
            enabled: self.otlp_endpoint.is_some(),
            service_name: service_name.to_string(),
            otlp_endpoint: self.otlp_endpoint.clone(),
            sampling_ratio: self.sampling_ratio,
            log_level: self.log_level.clone(),
            json_logs: self.log_format.eq_ignore_ascii_case("json"),
        }
    }
}
