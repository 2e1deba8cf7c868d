use super::state::AppState;
use crate::chat::ChatStatus;
use crate::session::SubmitError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordDurationRequest {
    pub duration_ms: f64,
}

/// Session status after a submit, stop or reset
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: ChatStatus,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(code: StatusCode, error: impl Into<String>) -> axum::response::Response {
    (
        code,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /chat
/// Current transcript, status and durations
pub async fn get_chat(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.session.view().await))
}

/// POST /chat/messages
/// Submit a user message and start streaming the reply
pub async fn submit_message(
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> impl IntoResponse {
    match state.session.submit(&req.text).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(StatusResponse {
                status: state.session.status().await,
                message: "Message submitted".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            let code = match &e {
                SubmitError::EmptyMessage => StatusCode::BAD_REQUEST,
                SubmitError::Busy => StatusCode::CONFLICT,
                SubmitError::NotHydrated => StatusCode::SERVICE_UNAVAILABLE,
                SubmitError::Backend(_) => {
                    error!("Failed to submit message: {}", e);
                    StatusCode::BAD_GATEWAY
                }
            };
            error_response(code, e.to_string())
        }
    }
}

/// POST /chat/stop
/// Halt the reply in progress
pub async fn stop_reply(State(state): State<AppState>) -> impl IntoResponse {
    state.session.stop().await;
    (
        StatusCode::OK,
        Json(StatusResponse {
            status: state.session.status().await,
            message: "Reply stopped".to_string(),
        }),
    )
}

/// POST /chat/reset
/// Clear the conversation
pub async fn reset_chat(State(state): State<AppState>) -> impl IntoResponse {
    info!("Resetting conversation");
    state.session.reset().await;
    (
        StatusCode::OK,
        Json(StatusResponse {
            status: state.session.status().await,
            message: state.clear_chat_text.clone(),
        }),
    )
}

/// PUT /chat/durations/:turn_id
/// Record how long a turn took to generate
pub async fn record_duration(
    State(state): State<AppState>,
    Path(turn_id): Path<String>,
    Json(req): Json<RecordDurationRequest>,
) -> impl IntoResponse {
    if !req.duration_ms.is_finite() {
        return error_response(StatusCode::BAD_REQUEST, "duration_ms must be a finite number");
    }

    state
        .session
        .record_duration(&turn_id, req.duration_ms)
        .await;
    (StatusCode::OK, Json(state.session.durations().await)).into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
