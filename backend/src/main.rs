//! Chart Keeper - Main Entry Point

use std::net::SocketAddr;
use std::sync::Arc;

use chart_keeper_backend::{
    api::{self, AppState},
    config::Config,
    error::Result,
    storage, telemetry,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    telemetry::init_tracing(&config.log_level);
    tracing::info!("Starting Chart Keeper");
    tracing::info!(
        storage_backend = ?config.storage_backend,
        storage_path = %config.storage_path,
        base_url = %config.base_url,
        index_key = %config.index_key,
        "Repository configured"
    );

    let storage = storage::from_config(&config);
    let addr: SocketAddr = config.bind_address.parse()?;
    let state = Arc::new(AppState::new(config, storage));

    // Build router
    let app = api::routes::create_router(state);

    // Start server
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}
