//! Observability module for metrics, tracing, and logging setup.
//!
//! This module provides:
//! - Structured logging with `tracing` (pretty for development, JSON otherwise)
//! - Metrics collection with a Prometheus handle rendered on `GET /metrics`
//! - Span and metric helpers used by the dispatcher and backend client

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use tracing_subscriber::prelude::*;

/// Initialize structured logging
///
/// `RUST_LOG` wins when set; otherwise `debug` enables verbose crate logs.
/// `LOG_FORMAT=pretty` (or debug mode) selects human readable output.
pub fn init_tracing(debug: bool) -> Result<()> {
    let crate_level = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        .add_directive(format!("ride_bot={}", crate_level).parse()?)
        .add_directive("teloxide=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    let pretty = debug
        || std::env::var("LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("pretty"))
            .unwrap_or(false);

    if pretty {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?;
    }

    let debug_mode = debug;
    tracing::info!(debug = debug_mode, pretty = pretty, "Tracing initialized with structured logging");
    Ok(())
}

/// Initialize metrics collection with the Prometheus recorder
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    metrics::describe_counter!("bot_events_total", "Inbound events by kind");
    metrics::describe_counter!("bot_events_dropped_total", "Events dropped before a handler ran");
    metrics::describe_counter!("bot_handler_errors_total", "Handler failures by handler");
    metrics::describe_histogram!("bot_handler_duration_seconds", "Handler execution time");
    metrics::describe_counter!("notifications_total", "Backend notifications by status");
    metrics::describe_counter!("backend_requests_total", "Backend REST calls by operation and outcome");

    tracing::info!("Metrics collection initialized");
    Ok(handle)
}

/// Span wrapping the dispatch of one inbound event
pub fn telegram_span(kind: &str, user_id: i64) -> tracing::Span {
    tracing::info_span!(
        "telegram_event",
        kind = kind,
        user_id = user_id,
        component = "dispatcher"
    )
}

/// Record an inbound event
pub fn record_event(kind: &'static str) {
    metrics::counter!("bot_events_total", "kind" => kind).increment(1);
}

/// Record an event that never reached a handler
pub fn record_dropped_event(reason: &'static str) {
    metrics::counter!("bot_events_dropped_total", "reason" => reason).increment(1);
}

/// Record handler execution metrics
pub fn record_handler_metrics(handler: &str, success: bool, duration: Duration) {
    let handler = handler.to_string();
    if !success {
        metrics::counter!("bot_handler_errors_total", "handler" => handler.clone()).increment(1);
    }
    metrics::histogram!("bot_handler_duration_seconds", "handler" => handler)
        .record(duration.as_secs_f64());
}

/// Record a relayed backend notification
pub fn record_notification(status: &str) {
    let status = status.to_string();
    metrics::counter!("notifications_total", "status" => status).increment(1);
}

/// Record backend request metrics
pub fn record_backend_request(operation: &str, outcome: &'static str, duration: Duration) {
    let operation = operation.to_string();
    metrics::counter!("backend_requests_total", "operation" => operation.clone(), "outcome" => outcome)
        .increment(1);
    metrics::histogram!("backend_request_duration_seconds", "operation" => operation)
        .record(duration.as_secs_f64());
}

/// Update circuit breaker state metric
pub fn update_circuit_breaker_state(is_open: bool) {
    metrics::gauge!("backend_circuit_breaker_open").set(if is_open { 1.0 } else { 0.0 });
}
