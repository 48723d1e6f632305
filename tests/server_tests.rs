//! HTTP routes: notification webhook, health and metrics

mod common;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::*;
use ride_bot::dialogue::ConversationState;
use ride_bot::errors::{AppError, AppResult};
use ride_bot::server::{router, AppState};
use ride_bot::state_store::{InMemoryStateStore, StateStore};
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower::ServiceExt;

/// Store whose backing service is down
struct UnreachableStore;

#[async_trait]
impl StateStore for UnreachableStore {
    async fn get_state(&self, _user_id: i64) -> AppResult<ConversationState> {
        Err(AppError::StateStore("connection refused".to_string()))
    }

    async fn save_state(&self, _user_id: i64, _state: &ConversationState) -> AppResult<()> {
        Err(AppError::StateStore("connection refused".to_string()))
    }

    async fn clear(&self, _user_id: i64) -> AppResult<()> {
        Err(AppError::StateStore("connection refused".to_string()))
    }

    async fn active_conversations(&self) -> AppResult<usize> {
        Err(AppError::StateStore("connection refused".to_string()))
    }

    async fn ping(&self) -> AppResult<()> {
        Err(AppError::StateStore("connection refused".to_string()))
    }
}

fn app_state(outbound: Arc<RecordingOutbound>) -> AppState {
    AppState::new(translator(), outbound, Arc::new(InMemoryStateStore::new()), None)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_notify_relays_to_the_passenger() {
    let outbound = Arc::new(RecordingOutbound::new());
    let app = router(app_state(outbound.clone()));

    let response = app
        .oneshot(post_json(
            "/notify",
            json!({"status": "arrived", "id": 812, "user": USER, "creator": {"language": "en"}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["relayed"], "arrived");
    assert_eq!(
        outbound.last_keyboard().unwrap().callbacks(),
        vec!["in_car:812"]
    );
}

#[tokio::test]
async fn test_notify_acknowledges_ignored_statuses() {
    let outbound = Arc::new(RecordingOutbound::new());
    let app = router(app_state(outbound.clone()));

    let response = app
        .oneshot(post_json(
            "/notify",
            json!({"status": "created", "id": 1, "user": USER}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["relayed"], Value::Null);
    assert!(outbound.take().is_empty());
}

#[tokio::test]
async fn test_notify_rejects_payload_without_user() {
    let app = router(app_state(Arc::new(RecordingOutbound::new())));

    let response = app
        .oneshot(post_json("/notify", json!({"status": "ended", "id": 1})))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_notify_reports_delivery_failure() {
    let outbound = Arc::new(RecordingOutbound::new());
    outbound.fail_sends.store(true, Ordering::SeqCst);
    let app = router(app_state(outbound));

    let response = app
        .oneshot(post_json(
            "/notify",
            json!({"status": "ended", "id": 1, "user": USER}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_health_reports_state_store() {
    let app = router(app_state(Arc::new(RecordingOutbound::new())));
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");

    let down = AppState::new(
        translator(),
        Arc::new(RecordingOutbound::new()),
        Arc::new(UnreachableStore),
        None,
    );
    let response = router(down).oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["state_store"], "unreachable");
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let app = router(app_state(Arc::new(RecordingOutbound::new())));
    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
