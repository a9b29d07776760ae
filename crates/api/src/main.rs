//! Trigger Engine - Main Entry Point
//!
//! Usage: `trigger-engine [CONFIG.toml]`. Without an argument the file named
//! by `TRIGGER_ENGINE_CONFIG` is used, if set.

use api::{init_logging, install_metrics_recorder, run_server, AppState};
use health_metrics::JsonFileSource;
use monitor::{EngineConfig, Monitor, MonitoringLoop};
use std::path::PathBuf;
use std::sync::Arc;
use storage::FileSink;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("TRIGGER_ENGINE_CONFIG").ok())
        .map(PathBuf::from);
    let config = EngineConfig::load(config_path.as_deref())?;

    init_logging(config.log_json)?;

    info!("=== Trigger Engine v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Reading metrics from {}, writing to {}",
        config.metrics_file.display(),
        config.data_dir.display()
    );

    let prometheus = match install_metrics_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Prometheus exporter unavailable: {}", e);
            None
        }
    };

    let addr = config.http_addr.clone();
    let source = Arc::new(JsonFileSource::new(config.metrics_file.clone()));
    let sink = Arc::new(FileSink::new(config.data_dir.clone()));
    let monitor = Arc::new(Monitor::new(config, source, sink));
    let scheduler = Arc::new(MonitoringLoop::new(monitor));

    scheduler.start().await;

    let state = Arc::new(AppState::new(Arc::clone(&scheduler), prometheus));
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
        }
        info!("Shutdown requested");
    };

    let served = run_server(&addr, state, shutdown).await;
    scheduler.stop().await;
    served
}
