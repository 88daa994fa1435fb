//! HTTP server for seeding and replaying cached responses
//!
//! Provides /health, POST /_seed and GET /_cache/{key}.

use crate::error::{Result, ServerError};
use crate::types::{is_valid_key, HealthResponse, SeedRequest, SeedResult};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use chameleon_cache::DiskCache;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Shared state for the HTTP server
pub struct ServerState {
    pub cache: DiskCache,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(cache: DiskCache) -> Self {
        Self {
            cache,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/_seed", post(seed))
        .route("/_cache/{key}", get(replay))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: SharedState, port: u16) -> std::io::Result<()> {
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let cache_stats = state.cache.stats().await;
    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0) as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        cache: cache_stats,
    })
}

/// Install a response under a caller-chosen key
async fn seed(
    State(state): State<SharedState>,
    Json(request): Json<SeedRequest>,
) -> Result<(StatusCode, Json<SeedResult>)> {
    if !is_valid_key(&request.key) {
        return Err(ServerError::BadRequest(format!(
            "key '{}' is not a valid blob name",
            request.key
        )));
    }

    let persisted = request.persist;
    let (key, recorded) = request.into_recorded();
    let cached = state.cache.put(&key, recorded).await?;
    info!(key = %key, status_code = cached.status_code, persisted, "Seeded response");

    Ok((
        StatusCode::CREATED,
        Json(SeedResult {
            key,
            status_code: cached.status_code,
            persisted,
        }),
    ))
}

/// Replay the cached response stored under `key`
async fn replay(State(state): State<SharedState>, Path(key): Path<String>) -> Result<Response> {
    let entry = state
        .cache
        .get(&key)
        .await
        .ok_or_else(|| ServerError::NotFound(format!("no cached response for '{}'", key)))?;

    let status = StatusCode::from_u16(entry.status_code).map_err(|e| {
        ServerError::Internal(format!("cached status {} for '{}': {}", entry.status_code, key, e))
    })?;

    let mut response = Response::new(Body::from(entry.body.clone()));
    *response.status_mut() = status;

    for (name, value) in &entry.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().append(name, value);
            }
            _ => warn!(key = %key, header = %name, "Skipping header that cannot be replayed"),
        }
    }

    Ok(response)
}
