use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Conversation
        .route("/chat", get(handlers::get_chat))
        .route("/chat/messages", post(handlers::submit_message))
        .route("/chat/stop", post(handlers::stop_reply))
        .route("/chat/reset", post(handlers::reset_chat))
        .route(
            "/chat/durations/:turn_id",
            put(handlers::record_duration),
        )
        // Browser UIs call this from another origin
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
