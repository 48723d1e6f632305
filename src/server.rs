//! HTTP surface of the service.
//!
//! - `POST /notify`: order lifecycle webhook from the backend
//! - `GET /health`: state store connectivity
//! - `GET /metrics`: Prometheus text exposition

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::bot::outbound::SharedOutbound;
use crate::config::ServerConfig;
use crate::localization::Translator;
use crate::notification::{self, NotificationOutcome, OrderNotification};
use crate::state_store::SharedStateStore;

/// Shared state of the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub translator: Arc<Translator>,
    pub outbound: SharedOutbound,
    pub state_store: SharedStateStore,
    /// `None` when no recorder is installed (tests)
    pub metrics: Option<PrometheusHandle>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        translator: Arc<Translator>,
        outbound: SharedOutbound,
        state_store: SharedStateStore,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            translator,
            outbound,
            state_store,
            metrics,
            started_at: Instant::now(),
        }
    }
}

/// Creates the router with all routes configured
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/notify", post(notify_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Bind and serve until the process exits
pub async fn serve(config: &ServerConfig, state: AppState) -> Result<(), std::io::Error> {
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "HTTP server listening");
    axum::serve(listener, router(state)).await
}

async fn notify_handler(
    State(state): State<AppState>,
    Json(payload): Json<OrderNotification>,
) -> impl IntoResponse {
    match notification::relay(&payload, &state.translator, state.outbound.as_ref()).await {
        Ok(NotificationOutcome::Sent(status)) => (
            StatusCode::OK,
            Json(json!({"status": "ok", "relayed": status})),
        ),
        Ok(NotificationOutcome::Ignored) => (
            StatusCode::OK,
            Json(json!({"status": "ok", "relayed": null})),
        ),
        Err(e) => {
            error!(
                error = %e,
                order_id = %payload.id,
                status = %payload.status,
                "Failed to relay notification"
            );
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"status": "error", "message": "delivery failed"})),
            )
        }
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let uptime_seconds = state.started_at.elapsed().as_secs();
    match state.state_store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "state_store": "ok",
                "uptime_seconds": uptime_seconds,
                "version": env!("CARGO_PKG_VERSION"),
            })),
        ),
        Err(e) => {
            error!(error = %e, "Health check failed: state store unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "state_store": "unreachable",
                    "uptime_seconds": uptime_seconds,
                })),
            )
        }
    }
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}
