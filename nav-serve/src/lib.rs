//! HTTP server for the nav-osm routing engine
//!
//! # Endpoints
//!
//! - `GET|POST /route` - Point-to-point routing with alternatives
//! - `POST /weight/update` - Live per-way cost multiplier
//! - `GET /health` - Health check
//! - `GET /profiles` - Available profiles
//! - `GET /profiles/{name}` - Speed, access and surface rules of one profile
//! - `POST /graph/reload` - Rebuild from map data and swap the graph
//! - `GET /api-docs/openapi.json` - OpenAPI document

pub mod api;
pub mod config;
pub mod state;

use std::sync::Arc;

use anyhow::{Context, Result};

pub use config::ServerConfig;
pub use state::{load_engine, AppState};

/// Load the graph and serve until Ctrl-C
pub async fn serve(config: ServerConfig) -> Result<()> {
    config.validate()?;

    let state = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || AppState::load(&config)).await??
    };
    let app = api::build_router(Arc::new(state));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
