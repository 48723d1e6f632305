//! # Application Error Types
//!
//! This module defines the error types shared by the dispatcher, the backend
//! client and the conversation state store. Handlers return `anyhow::Result`
//! and the dispatcher downcasts to [`AppError`] to decide which message the
//! user sees.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// Validation errors that escaped the validator boundary
    Validation(String),
    /// Backend REST API failures (unreachable, bad status, malformed body)
    Backend(String),
    /// Conversation state storage failures
    StateStore(String),
    /// Translation loading or formatting failures
    Translation(String),
    /// Internal application errors
    Internal(String),
}

impl AppError {
    /// Whether the failure belongs to an external collaborator.
    ///
    /// Collaborator failures are shown to the user as "service unavailable"
    /// instead of the generic fallback message.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(self, AppError::Backend(_) | AppError::StateStore(_))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::Validation(msg) => write!(f, "[VALIDATION] {}", msg),
            AppError::Backend(msg) => write!(f, "[BACKEND] {}", msg),
            AppError::StateStore(msg) => write!(f, "[STATE] {}", msg),
            AppError::Translation(msg) => write!(f, "[I18N] {}", msg),
            AppError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<AppError>() {
            Ok(app_error) => app_error,
            Err(other) => AppError::Internal(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Backend(err.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::StateStore(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("serialization failed: {}", err))
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Standardized error logging utilities for consistent error reporting across the application
pub mod error_logging {
    use tracing::{error, warn};

    /// Log backend REST failures with request context
    pub fn log_backend_error(
        error: &impl std::fmt::Display,
        operation: &str,
        endpoint: Option<&str>,
        attempt_count: Option<u32>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            endpoint = ?endpoint,
            attempt_count = ?attempt_count,
            "Backend operation failed"
        );
    }

    /// Log a failure raised inside a dispatched handler
    pub fn log_handler_error(
        error: &impl std::fmt::Display,
        handler: &str,
        user_id: i64,
        event_kind: &str,
    ) {
        error!(
            error = %error,
            handler = %handler,
            user_id = %user_id,
            event_kind = %event_kind,
            "Handler failed"
        );
    }

    /// Log rejected user input.
    ///
    /// Validation failures are expected traffic, so they go to `warn`.
    pub fn log_validation_error(
        error_key: &str,
        user_id: i64,
        input_type: &str,
        input_value: Option<&str>,
    ) {
        warn!(
            error_key = %error_key,
            user_id = %user_id,
            input_type = %input_type,
            input_value = ?input_value.map(|v| if v.chars().count() > 100 { format!("{}...", v.chars().take(100).collect::<String>()) } else { v.to_string() }),
            "Validation failed"
        );
    }

    /// Log state store failures
    pub fn log_state_error(error: &impl std::fmt::Display, operation: &str, user_id: i64) {
        error!(
            error = %error,
            operation = %operation,
            user_id = %user_id,
            "Conversation state operation failed"
        );
    }

    /// Log configuration errors during startup/initialization
    pub fn log_config_error(error: &impl std::fmt::Display, config_key: &str, operation: &str) {
        error!(
            error = %error,
            config_key = %config_key,
            operation = %operation,
            "Configuration error"
        );
    }
}
