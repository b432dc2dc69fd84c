//! API Routes
//!
//! Key operations and admin endpoints, merged under one router with CORS
//! and request tracing.

use axum::{
    http::Method,
    routing::{delete, get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    capacity_handler, delete_handler, get_handler, health_handler, info_handler, set_handler,
    stats_handler, AppState,
};

/// `PUT /set`, `GET /get/:key`, `DELETE /del/:key`
fn key_routes() -> Router<AppState> {
    Router::new()
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/del/:key", delete(delete_handler))
}

/// `PUT /capacity`, `GET /stats`, `GET /info`, `GET /health`
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/capacity", put(capacity_handler))
        .route("/stats", get(stats_handler))
        .route("/info", get(info_handler))
        .route("/health", get(health_handler))
}

/// Builds the full router around `state`.
///
/// CORS admits any origin but only the methods the endpoints use.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .merge(key_routes())
        .merge(admin_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
