//! Unity Console API Server
//!
//! Serves the admin console backend on `CONSOLE_PORT` (or `PORT`).

use tracing_subscriber::EnvFilter;
use unity_console_api::{build_router, config::ServerConfig, sessions, AppState};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(config = ?config, "Loaded configuration");
    if config.databricks_host.is_none() {
        tracing::warn!("DATABRICKS_HOST is not set, vendor routes will return 500");
    }

    let port = config.port;
    let sweep_interval = config.session_sweep_interval;
    let state = AppState::new(config);
    let sweeper = sessions::spawn_sweeper(state.sessions.clone(), sweep_interval);

    let app = build_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting Unity console API on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
    }
    sweeper.abort();
    tracing::info!("Server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
