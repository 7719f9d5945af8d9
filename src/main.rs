use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use inputrank::api::{start_server, AppState, Metrics, ServerConfig};
use inputrank::storage::StoreConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("inputrank=info".parse()?))
        .init();

    tracing::info!("inputrank starting...");

    let store_config = StoreConfig::from_env();
    let store = Arc::new(store_config.open()?);
    tracing::info!("Opened metrics store at {}", store_config.data_dir.display());

    let state = Arc::new(AppState::new(store, Arc::new(Metrics::new())));

    let config = ServerConfig::from_env();

    start_server(config, state, shutdown_signal()).await?;

    tracing::info!("inputrank stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
