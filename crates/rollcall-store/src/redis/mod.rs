//! Redis-backed store adapter.

mod store;

pub use store::{RedisStore, RedisStoreParameters};

use deadpool_redis::{redis, Config, Pool, Runtime};
use rollcall_config::RedisConfig;
use rollcall_core::{RollcallError, RollcallResult};
use tracing::info;

/// Create a Redis connection pool and verify it with a PING.
pub async fn create_pool(config: &RedisConfig) -> RollcallResult<Pool> {
    info!(target: "rollcall::redis", url = %config.url, "Creating Redis connection pool");

    let cfg = Config::from_url(&config.url);

    let pool = cfg
        .builder()
        .map_err(|e| RollcallError::Configuration(format!("Invalid Redis config: {}", e)))?
        .max_size(config.pool_size as usize)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| RollcallError::Configuration(format!("Failed to create pool: {}", e)))?;

    let mut conn = pool
        .get()
        .await
        .map_err(|e| RollcallError::store(format!("Failed to get Redis connection: {}", e)))?;
    redis::cmd("PING")
        .query_async::<String>(&mut conn)
        .await
        .map_err(|e| RollcallError::store(format!("Redis PING failed: {}", e)))?;

    info!(target: "rollcall::redis", "Redis connection pool created successfully");

    Ok(pool)
}
