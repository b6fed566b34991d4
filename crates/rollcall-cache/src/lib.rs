//! # Rollcall Cache
//!
//! Domain caches built on the store adapter:
//!
//! - [`IndexedCache`]: item records plus a bounded recency index per domain,
//!   with lazy ghost reconciliation
//! - [`OnlineUserCache`]: the presence cache, with sliding expiration on read
//! - [`KeyspaceMonitor`]: key counts per pattern and store memory usage

pub mod indexed_cache;
pub mod keys;
pub mod metrics;
pub mod monitor;
pub mod presence;

pub use indexed_cache::IndexedCache;
pub use keys::{DomainKeys, KeySpace};
pub use metrics::{register_metrics, CacheMetrics};
pub use monitor::{
    parse_memory_section, KeyStats, KeyspaceMonitor, KeyspaceMonitorParameters, MemoryUsage, StoreMonitor,
};
pub use presence::{OnlineUser, OnlineUserCache};
