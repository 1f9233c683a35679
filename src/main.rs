//! Dedup File Server
//!
//! Accepts file uploads over HTTP, stores each distinct content once, and
//! serves stored files back by name.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;

use dedup_file_server::config::Config;
use dedup_file_server::logging;
use dedup_file_server::routes;
use dedup_file_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();

    let (config, config_error) = match Config::from_env() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    // Initialize tracing
    let _log_guards = logging::init(&config.logging)?;

    if let Some(e) = config_error {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
    }

    tracing::info!("Starting Dedup File Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Storage directory: {}", config.storage.data_dir.display());
    tracing::info!("Max upload size: {} bytes", config.upload.max_size);

    // Build the content index from whatever is already stored
    let app_state = AppState::open(config.clone())
        .await
        .context("Failed to open storage directory")?;
    tracing::info!(
        "Different files in {} = {}",
        config.storage.data_dir.display(),
        app_state.store().len()
    );

    let app = routes::router(app_state);

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.server.host, config.server.port))?;
    tracing::info!("Dedup File Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
