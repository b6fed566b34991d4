//! Dependency injection module using Shaku.
//!
//! `MonitorModule` holds the Redis store and the keyspace monitor that
//! reads it. Caches are built on top of the resolved store.

use deadpool_redis::Pool;
use rollcall_cache::{KeyspaceMonitor, KeyspaceMonitorParameters, OnlineUserCache, StoreMonitor};
use rollcall_config::{AppConfig, MonitorConfig, RedisConfig};
use rollcall_core::{module, HasComponent, RollcallResult};
use rollcall_store::{create_pool, KeyValueStore, RedisStore, RedisStoreParameters};
use std::sync::Arc;
use tracing::warn;

// Store adapter plus the monitor that injects it.
module! {
    pub MonitorModule {
        components = [
            RedisStore,
            KeyspaceMonitor,
        ],
        providers = [],
    }
}

/// Builder for [`MonitorModule`].
#[derive(Default)]
pub struct AppModuleBuilder {
    pool: Option<Arc<Pool>>,
    monitor: MonitorConfig,
}

impl AppModuleBuilder {
    /// Creates a builder with no Redis pool and default monitor settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the Redis connection pool.
    #[must_use]
    pub fn with_pool(mut self, pool: Pool) -> Self {
        self.pool = Some(Arc::new(pool));
        self
    }

    /// Sets the monitor configuration.
    #[must_use]
    pub fn with_monitor_config(mut self, monitor: MonitorConfig) -> Self {
        self.monitor = monitor;
        self
    }

    /// Builds the module.
    #[must_use]
    pub fn build(self) -> MonitorModule {
        MonitorModule::builder()
            .with_component_parameters::<RedisStore>(RedisStoreParameters { pool: self.pool })
            .with_component_parameters::<KeyspaceMonitor>(KeyspaceMonitorParameters {
                patterns: self.monitor.patterns,
                scan_count: self.monitor.scan_count.max(1),
                memory_fields: self.monitor.memory_fields,
            })
            .build()
    }
}

/// Builds the module from configuration, connecting to Redis if enabled.
///
/// With Redis disabled every store call fails and the monitor reports
/// empty results.
pub async fn build_monitor_module(
    redis_config: &RedisConfig,
    monitor_config: &MonitorConfig,
) -> RollcallResult<Arc<MonitorModule>> {
    let mut builder = AppModuleBuilder::new().with_monitor_config(monitor_config.clone());

    if redis_config.enabled {
        builder = builder.with_pool(create_pool(redis_config).await?);
    } else {
        warn!("Redis is disabled; store operations will fail");
    }

    Ok(Arc::new(builder.build()))
}

// ============================================================================
// Module Resolution Helpers
// ============================================================================

/// Trait for resolving store components from a module.
pub trait StoreResolver {
    /// Resolves the shared store handle.
    fn store(&self) -> Arc<dyn KeyValueStore>;

    /// Resolves the keyspace monitor.
    fn monitor(&self) -> Arc<dyn StoreMonitor>;

    /// Builds the presence cache over the resolved store.
    fn online_users(&self, config: &AppConfig) -> RollcallResult<OnlineUserCache> {
        OnlineUserCache::new(self.store(), &config.cache.user, config.cache.ghost_policy)
    }
}

impl StoreResolver for MonitorModule {
    fn store(&self) -> Arc<dyn KeyValueStore> {
        self.resolve()
    }

    fn monitor(&self) -> Arc<dyn StoreMonitor> {
        self.resolve()
    }
}
