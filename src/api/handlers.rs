//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::{Cache, Target};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, GetResponse, HealthResponse, KeysResponse, SetRequest, SetResponse,
    StatsResponse,
};
use crate::registry::Registry;

/// Application state shared across all handlers.
///
/// Caches synchronize internally, so the handle is shared without an outer lock.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<dyn Cache>,
}

impl AppState {
    /// Creates a new AppState around the given cache.
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }

    /// Builds the adapter named in the configuration.
    pub fn from_config(registry: &Registry, config: &Config) -> Result<Self> {
        let cache = registry.create(&config.adapter, config)?;
        Ok(Self::new(cache))
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair with optional TTL and write directives.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let key = req.key.clone();
    let ttl = req.ttl();
    state.cache.set(req.into_entry()).await?;

    Ok(Json(SetResponse::new(state.cache.name(), key, ttl)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state.cache.get(&key, Target::Text).await?;

    Ok(Json(GetResponse::new(key, value.to_json())))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state.cache.delete(&key).await?;

    Ok(Json(DeleteResponse::new(state.cache.name(), key)))
}

/// Handler for GET /keys
pub async fn keys_handler(State(state): State<AppState>) -> Json<KeysResponse> {
    Json(KeysResponse::new(state.cache.keys().await))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats();
    Json(StatsResponse::new(state.cache.name(), &stats))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::new(
        state.cache.name(),
        state.cache.is_active(),
    ))
}
