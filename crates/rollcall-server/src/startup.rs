//! Server startup utilities.

use rollcall_config::AppConfig;
use tracing::info;

/// Prints the startup banner.
pub fn print_banner() {
    info!(r#"
    ____        ____           ____
   / __ \____  / / /________ _/ / /
  / /_/ / __ \/ / / ___/ __ `/ / /
 / _, _/ /_/ / / / /__/ /_/ / / /
/_/ |_|\____/_/_/\___/\__,_/_/_/
    "#);
}

/// Prints what the server is about to monitor.
pub fn print_startup_info(config: &AppConfig) {
    let separator = "=".repeat(60);
    info!("{}", separator);
    info!("Redis:     {} (pool size {})", config.redis.url, config.redis.pool_size);
    info!(
        "Presence:  {} (ttl {:?}s, limit {})",
        config.cache.user.domain, config.cache.user.ttl_secs, config.cache.user.limit
    );
    if config.monitor.enabled {
        info!("Monitor:   every {}s", config.monitor.interval_secs);
        for pattern in &config.monitor.patterns {
            info!("  {:<10} {}", pattern.name, pattern.pattern);
        }
    } else {
        info!("Monitor:   disabled");
    }
    info!("{}", separator);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_banner_does_not_panic() {
        let _ = tracing_subscriber::fmt::try_init();
        print_banner();
    }

    #[test]
    fn test_print_startup_info_does_not_panic() {
        let _ = tracing_subscriber::fmt::try_init();
        print_startup_info(&AppConfig::default());
    }

    #[test]
    fn test_print_startup_info_monitor_disabled() {
        let _ = tracing_subscriber::fmt::try_init();
        let mut config = AppConfig::default();
        config.monitor.enabled = false;
        print_startup_info(&config);
    }
}
