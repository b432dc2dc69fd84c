//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{debug, info};

use crate::cache::{CacheEngine, CacheInfo, CacheStats};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    CapacityRequest, DeleteResponse, GetResponse, HealthResponse, SetRequest, SetResponse,
};

/// Application state shared across all handlers.
///
/// The engine synchronizes internally, so handlers share a plain clone of it.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Thread-safe cache engine
    pub cache: CacheEngine<String, String>,
}

impl AppState {
    /// Creates a new AppState around the given engine.
    pub fn new(cache: CacheEngine<String, String>) -> Self {
        Self { cache }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Starts the background sweeper when the configuration enables it.
    pub fn from_config(config: &Config) -> Self {
        Self::new(CacheEngine::from_config(config))
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair with optional TTL and idle survival.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let options = req.entry_options();
    let SetRequest {
        key,
        value,
        ttl_ms,
        survive_ms,
    } = req;
    state.cache.put_with(key.clone(), value, options);
    debug!("Stored key '{}'", key);

    Ok(Json(SetResponse {
        key,
        ttl_ms,
        survive_ms,
        size: state.cache.len(),
    }))
}

/// Handler for GET /get/:key
///
/// A hit moves the key to the head of the recency chain.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get_with_stats(key.as_str()) {
        Some((value, snapshot)) => Ok(Json(GetResponse::from_snapshot(key, value, &snapshot))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if !state.cache.remove(key.as_str()) {
        return Err(CacheError::NotFound(key));
    }
    Ok(Json(DeleteResponse {
        key,
        removed: true,
        size: state.cache.len(),
    }))
}

/// Handler for PUT /capacity
///
/// Resizes the cache, evicting least recently used entries as needed.
pub async fn capacity_handler(
    State(state): State<AppState>,
    Json(req): Json<CapacityRequest>,
) -> Result<Json<CacheInfo>> {
    state.cache.set_capacity(req.capacity)?;
    info!("Capacity changed to {}", req.capacity);
    Ok(Json(state.cache.info()))
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats())
}

/// Handler for GET /info
///
/// Returns the diagnostic snapshot including sweeper state.
pub async fn info_handler(State(state): State<AppState>) -> Json<CacheInfo> {
    Json(state.cache.info())
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.is_sweep_running()))
}
