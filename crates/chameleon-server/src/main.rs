//! Chameleon Server - record/replay response cache over HTTP
//!
//! Rehydrates the response cache from its data directory at startup and
//! exposes endpoints to seed and replay cached responses.

mod config;
mod error;
mod server;
mod types;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::server::{start_server, ServerState, SharedState};
use chameleon_cache::DiskCache;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("chameleon_server=info".parse()?)
        .add_directive("chameleon_cache=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting Chameleon Server...");

    let config = ServerConfig::from_env()?;
    info!("Port: {}", config.port);
    info!("Data dir: {:?}", config.data_dir);
    info!("Blob store: {:?}", config.blob_store);

    let cache = DiskCache::with_store(&config.data_dir, config.build_store())?;
    let entries = cache.rehydrate().await?;
    info!(entries, spec_path = %cache.spec_path().display(), "Loaded cached responses");

    let state: SharedState = Arc::new(ServerState::new(cache));

    // Start HTTP server (blocking)
    start_server(state, config.port).await?;

    Ok(())
}
