//! # Rollcall Server
//!
//! Connects to Redis and periodically reports key counts per domain
//! pattern and store memory usage until Ctrl+C or SIGTERM.

use rollcall_config::{AppConfig, ConfigLoader};
use rollcall_core::telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig};
use rollcall_core::RollcallResult;
use rollcall_server::app::MonitorApp;
use rollcall_server::di::{build_monitor_module, StoreResolver};
use rollcall_server::startup::{print_banner, print_startup_info};
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match ConfigLoader::from_default_location() {
        Ok(loader) => loader.get().await,
        Err(e) => {
            let _ = init_telemetry(&TelemetryConfig::default());
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&config.observability.telemetry(&config.app.name)) {
        eprintln!("Failed to initialize telemetry: {}", e);
    }

    print_banner();
    info!("Starting Rollcall Server...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Environment: {}", config.app.environment);

    let result = run(config).await;
    shutdown_telemetry();

    if let Err(e) = result {
        error!("Application error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> RollcallResult<()> {
    if config.observability.metrics_enabled {
        rollcall_cache::register_metrics();
    }

    let module = build_monitor_module(&config.redis, &config.monitor).await?;

    // Fail on a bad presence domain before entering the loop.
    let presence = module.online_users(&config)?;
    info!(presence = ?presence.index(), "Presence cache ready");

    print_startup_info(&config);

    let app = MonitorApp::new(module.monitor(), config.monitor.clone());
    app.run_until(shutdown_signal()).await;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
