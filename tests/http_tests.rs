// HTTP API tests
//
// Requests are sent straight to the router with `oneshot`, no socket needed.

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sidekick_chat::{
    create_router, AppState, ChatSession, MemoryStore, ScriptedBackend, SessionConfig,
    SnapshotStore,
};
use std::sync::Arc;
use tower::ServiceExt;

async fn app() -> (Router, Arc<ChatSession>) {
    let store = Arc::new(SnapshotStore::with_default_key(Box::new(MemoryStore::new())));
    let config = SessionConfig {
        welcome_message: "Hello from the API".to_string(),
        track_generation_time: false,
    };
    let session = Arc::new(ChatSession::new(
        config,
        store,
        Arc::new(ScriptedBackend::echo()),
    ));
    session.bootstrap().await;

    let router = create_router(AppState::new(Arc::clone(&session), "Chat cleared"));
    (router, session)
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => request.body(Body::empty())?,
    };

    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    Ok((status, value))
}

#[tokio::test]
async fn test_health_check() -> Result<()> {
    let (router, _session) = app().await;
    let (status, _) = send(&router, "GET", "/health", None).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_get_chat_returns_welcome() -> Result<()> {
    let (router, _session) = app().await;

    let (status, body) = send(&router, "GET", "/chat", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "idle");
    assert_eq!(body["can_submit"], true);
    assert_eq!(body["messages"][0]["role"], "assistant");
    assert_eq!(body["messages"][0]["parts"][0]["type"], "text");
    assert_eq!(body["messages"][0]["parts"][0]["text"], "Hello from the API");
    Ok(())
}

#[tokio::test]
async fn test_submit_message_flow() -> Result<()> {
    let (router, session) = app().await;

    let (status, body) = send(
        &router,
        "POST",
        "/chat/messages",
        Some(json!({ "text": "ping" })),
    )
    .await?;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["message"], "Message submitted");
    assert!(body["status"].is_string());

    session.wait_for_stream().await;

    let (_, body) = send(&router, "GET", "/chat", None).await?;
    assert_eq!(body["status"], "done");
    assert_eq!(body["messages"][1]["parts"][0]["text"], "ping");
    assert_eq!(body["messages"][2]["parts"][0]["text"], "You said: ping");
    Ok(())
}

#[tokio::test]
async fn test_blank_message_is_bad_request() -> Result<()> {
    let (router, _session) = app().await;

    let (status, body) = send(
        &router,
        "POST",
        "/chat/messages",
        Some(json!({ "text": "  " })),
    )
    .await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_record_duration_and_reset() -> Result<()> {
    let (router, session) = app().await;

    let (status, body) = send(
        &router,
        "PUT",
        "/chat/durations/m1",
        Some(json!({ "duration_ms": 1200 })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["m1"], 1200.0);

    let (status, body) = send(&router, "POST", "/chat/reset", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Chat cleared");

    assert!(session.messages().await.is_empty());
    assert!(session.durations().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_stop_without_reply_is_ok() -> Result<()> {
    let (router, _session) = app().await;
    let (status, body) = send(&router, "POST", "/chat/stop", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "idle");
    Ok(())
}
