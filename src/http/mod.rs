//! HTTP API for chat UIs
//!
//! This module exposes the conversation over a small JSON API:
//! - GET /chat - Transcript, status and durations
//! - POST /chat/messages - Submit a message
//! - POST /chat/stop - Stop the reply in progress
//! - POST /chat/reset - Clear the conversation
//! - PUT /chat/durations/:turn_id - Record a turn's generation time
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
