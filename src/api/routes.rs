//! API Routes
//!
//! Configures the Axum router with all cache endpoints.

use axum::{
    routing::{get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_handler, get_handler, health_handler, keys_handler, set_handler,
    stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /cache/:scope/:key` - Store a JSON value
/// - `GET /cache/:scope/:key` - Retrieve a value by key
/// - `DELETE /cache/:scope/:key` - Remove a key
/// - `GET /cache/:scope` - List keys in a cache
/// - `DELETE /cache/:scope` - Clear a cache
/// - `GET /stats` - Per-cache statistics
/// - `GET /health` - Health check endpoint
///
/// `scope` is `local` or `session`.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/cache/:scope/:key",
            put(set_handler).get(get_handler).delete(delete_handler),
        )
        .route("/cache/:scope", get(keys_handler).delete(clear_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
