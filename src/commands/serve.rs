//! `serve` command: run the HTTP service until Ctrl-C

use anyhow::Context;
use std::net::SocketAddr;

use crate::api;
use crate::config::Config;
use crate::error::{DilemmaError, Result};
use crate::game::metrics::init_metrics_exporter;
use crate::game::GameService;

/// Open storage, bind the listener, and serve until shutdown
pub async fn run_serve(config: Config) -> Result<()> {
    tracing::info!(
        "Starting {} (environment: {})",
        config.app.name,
        config.app.environment
    );

    init_metrics_exporter();

    let addr: SocketAddr = config.server.bind.parse().map_err(|e| {
        DilemmaError::Config(format!("Invalid bind address {}: {}", config.server.bind, e))
    })?;

    let service = tokio::task::spawn_blocking({
        let config = config.clone();
        move || GameService::from_config(&config)
    })
    .await
    .context("Storage initialization task failed")??;

    let app = api::router(service, &config);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let root = if config.server.root_path.is_empty() {
        "/"
    } else {
        config.server.root_path.as_str()
    };
    tracing::info!("Listening on http://{} (game routes under {})", addr, root);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("Shutting down {}...", config.app.name);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
