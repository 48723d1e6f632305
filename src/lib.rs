//! # Ride Bot
//!
//! Telegram front-end of a ride-hailing service: collects ride and parcel
//! requests through a multi-step conversation, verifies passenger phone
//! numbers, and relays order lifecycle events from the ride-matching
//! backend back to the passenger.

pub mod backend;
pub mod bot;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod dialogue;
pub mod errors;
pub mod geo;
pub mod localization;
pub mod notification;
pub mod observability;
pub mod pricing;
pub mod rate_limiter;
pub mod server;
pub mod slug_detection;
pub mod state_store;
pub mod validation;

// Re-export types for easier access
pub use config::AppConfig;
pub use errors::{AppError, AppResult};
