//! API Routes
//!
//! Configures the Axum router with all summary and cache endpoints.

use axum::{
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_cache_handler, create_transaction_handler, delete_transaction_handler,
    get_transaction_handler, health_handler, list_transactions_handler, stats_handler,
    summary_handler, update_transaction_handler, AppState,
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
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/cache", delete(clear_cache_handler))
        .route("/users/:owner/summary", get(summary_handler))
        .route(
            "/users/:owner/transactions",
            get(list_transactions_handler).post(create_transaction_handler),
        )
        .route(
            "/users/:owner/transactions/:id",
            get(get_transaction_handler)
                .put(update_transaction_handler)
                .delete(delete_transaction_handler),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
