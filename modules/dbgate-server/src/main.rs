use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use dbgate_common::Config;
use dbgate_migrate::run_migrations;
use dbgate_server::{reload, router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting dbgate-server");

    let config = Config::from_env().context("Invalid configuration")?;

    // 1) Migrations
    let report = run_migrations(&config).await?;
    tracing::info!(
        applied = report.applied.len(),
        already_applied = report.already_applied,
        "Database schema up to date"
    );

    // 2) API server
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect_with(config.db.connect_options())
        .await?;

    if config.server.reload {
        reload::spawn_reload_listener(config.clone());
    }

    let app = router(Arc::new(AppState { pool }));

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("dbgate-server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
