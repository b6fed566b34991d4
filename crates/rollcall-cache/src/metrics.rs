//! Cache index and keyspace metrics.

use metrics::{counter, describe_counter, describe_gauge, gauge};

/// Metric names for the cache index.
pub mod names {
    /// Total items written through `add`.
    pub const CACHE_ADDS_TOTAL: &str = "rollcall_cache_adds_total";
    /// Total point reads that found an item.
    pub const CACHE_HITS_TOTAL: &str = "rollcall_cache_hits_total";
    /// Total point reads that found nothing.
    pub const CACHE_MISSES_TOTAL: &str = "rollcall_cache_misses_total";
    /// Total ghost ids pruned from index lists.
    pub const CACHE_GHOSTS_PRUNED_TOTAL: &str = "rollcall_cache_ghosts_pruned_total";
    /// Total items deleted.
    pub const CACHE_DELETES_TOTAL: &str = "rollcall_cache_deletes_total";
    /// Total sliding TTL refreshes.
    pub const CACHE_TTL_REFRESHES_TOTAL: &str = "rollcall_cache_ttl_refreshes_total";

    /// Keys matching a monitored pattern.
    pub const KEYSPACE_KEYS: &str = "rollcall_keyspace_keys";
    /// Store memory usage in bytes, per INFO field.
    pub const STORE_MEMORY_BYTES: &str = "rollcall_store_memory_bytes";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::CACHE_ADDS_TOTAL, "Total number of items added to a cache");
    describe_counter!(names::CACHE_HITS_TOTAL, "Total number of cache point reads that hit");
    describe_counter!(names::CACHE_MISSES_TOTAL, "Total number of cache point reads that missed");
    describe_counter!(
        names::CACHE_GHOSTS_PRUNED_TOTAL,
        "Total number of ghost ids removed from index lists"
    );
    describe_counter!(names::CACHE_DELETES_TOTAL, "Total number of items deleted from a cache");
    describe_counter!(
        names::CACHE_TTL_REFRESHES_TOTAL,
        "Total number of sliding expiration refreshes"
    );

    describe_gauge!(names::KEYSPACE_KEYS, "Number of keys matching a monitored pattern");
    describe_gauge!(names::STORE_MEMORY_BYTES, "Store memory usage in bytes");
}

/// Cache metrics recorder.
#[derive(Clone)]
pub struct CacheMetrics;

impl CacheMetrics {
    /// Record an item added.
    pub fn added(domain: &str) {
        counter!(names::CACHE_ADDS_TOTAL, "domain" => domain.to_string()).increment(1);
    }

    /// Record a point read outcome.
    pub fn lookup(domain: &str, hit: bool) {
        let name = if hit {
            names::CACHE_HITS_TOTAL
        } else {
            names::CACHE_MISSES_TOTAL
        };
        counter!(name, "domain" => domain.to_string()).increment(1);
    }

    /// Record ghosts pruned during list reconciliation.
    pub fn ghosts_pruned(domain: &str, count: usize) {
        counter!(names::CACHE_GHOSTS_PRUNED_TOTAL, "domain" => domain.to_string())
            .increment(count as u64);
    }

    /// Record an item deleted.
    pub fn deleted(domain: &str) {
        counter!(names::CACHE_DELETES_TOTAL, "domain" => domain.to_string()).increment(1);
    }

    /// Record a sliding expiration refresh.
    pub fn ttl_refreshed(domain: &str) {
        counter!(names::CACHE_TTL_REFRESHES_TOTAL, "domain" => domain.to_string()).increment(1);
    }

    /// Update the key count for a monitored pattern.
    pub fn key_count(name: &str, count: u64) {
        gauge!(names::KEYSPACE_KEYS, "pattern" => name.to_string()).set(count as f64);
    }

    /// Update a memory field gauge.
    pub fn memory(field: &str, bytes: i64) {
        gauge!(names::STORE_MEMORY_BYTES, "field" => field.to_string()).set(bytes as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        register_metrics();
    }

    #[test]
    fn test_cache_metrics() {
        CacheMetrics::added("User");
        CacheMetrics::lookup("User", true);
        CacheMetrics::lookup("User", false);
        CacheMetrics::ghosts_pruned("User", 2);
        CacheMetrics::deleted("User");
        CacheMetrics::ttl_refreshed("User");
        CacheMetrics::key_count("users", 42);
        CacheMetrics::memory("used_memory", 1024);
    }
}
