//! API Routes
//!
//! Configures the Axum router with the object endpoints and the service
//! endpoints.

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_object, fallback_handler, get_object, head_object, health_handler, put_object,
    stats_handler, AppState,
};
use super::middleware::apply_chain;

/// Largest accepted PUT body in bytes.
pub const MAX_BODY_SIZE: usize = 512 * 1024 * 1024;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET|PUT|DELETE|HEAD /objects/:bucket/*key` - Object operations
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
///
/// Anything else under `/objects` has an empty bucket or key and gets 400.
///
/// # Middleware
/// - Object routes: logging, metrics and bucket access policy
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // HEAD is registered explicitly so it does not fall through to GET
    let objects = Router::new()
        .route(
            "/objects/:bucket/*key",
            get(get_object)
                .head(head_object)
                .put(put_object)
                .delete(delete_object),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE));
    let objects = apply_chain(objects, state.access.clone());

    Router::new()
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .merge(objects)
        .fallback(fallback_handler)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
