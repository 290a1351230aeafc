//! API Routes
//!
//! Configures the Axum router with all cache endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, flush_handler, fresh_handler, get_handler, health_handler,
    list_caches_handler, set_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/caches/:cache/keys/:key",
            put(set_handler).get(get_handler).delete(clear_handler),
        )
        .route("/caches/:cache/keys/:key/fresh", get(fresh_handler))
        .route("/caches/:cache/flush", post(flush_handler))
        .route("/caches/:cache/stats", get(stats_handler))
        .route("/caches", get(list_caches_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
