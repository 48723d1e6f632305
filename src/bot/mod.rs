//! Bot module for handling chat interactions
//!
//! This module is split into several submodules:
//! - `events`: transport-neutral inbound events and callback parsing
//! - `dispatcher`: handler registry, routing, rate limiting and error containment
//! - `handlers`: registration of every command, callback, step and content handler
//! - `command_handlers`, `callbacks`: menu commands and global callbacks
//! - `booking_flow`, `post_flow`, `phone_verification`: the conversation flows
//! - `outbound`, `ui_builder`: outbound chat actions and keyboards
//! - `telegram`: conversion of teloxide updates into events

pub mod booking_flow;
pub mod callbacks;
pub mod command_handlers;
pub mod dispatcher;
pub mod events;
pub mod handlers;
pub mod outbound;
pub mod phone_verification;
pub mod post_flow;
pub mod telegram;
pub mod ui_builder;

use crate::backend::models::{City, Passenger};
use crate::backend::{SharedCityDirectory, SharedGeocoder, SharedRideBackend};
use crate::cache::CacheManager;
use crate::config::AppConfig;
use crate::dialogue::Step;
use crate::errors::AppResult;
use crate::localization::Translator;
use crate::state_store::SharedStateStore;
use events::InboundEvent;
use outbound::SharedOutbound;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use ui_builder::Keyboard;

pub use dispatcher::{DispatchOutcome, Dispatcher, Registry, RegistryBuilder};
pub use handlers::{build_registry, register_handlers};

/// Counters shared between the dispatcher and the `/stats` command
#[derive(Debug, Default)]
pub struct DispatchStats {
    pub handled: AtomicU64,
    pub failed: AtomicU64,
    pub dropped: AtomicU64,
    pub rate_limited: AtomicU64,
    pub registered_handlers: AtomicUsize,
}

impl DispatchStats {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// Long-lived collaborators, created once at startup
pub struct Services {
    pub config: AppConfig,
    pub translator: Arc<Translator>,
    pub state: SharedStateStore,
    pub backend: SharedRideBackend,
    pub cities: SharedCityDirectory,
    pub geocoder: SharedGeocoder,
    pub outbound: SharedOutbound,
    pub cache: CacheManager,
    pub stats: Arc<DispatchStats>,
}

/// Everything a handler needs for one event
#[derive(Clone)]
pub struct HandlerContext {
    pub event: InboundEvent,
    pub services: Arc<Services>,
    /// Resolved user language
    pub language: String,
    /// Step the user was on when the event arrived
    pub step: Option<Step>,
}

impl HandlerContext {
    pub fn user_id(&self) -> i64 {
        self.event.user_id
    }

    pub fn chat_id(&self) -> i64 {
        self.event.chat_id
    }

    pub fn translator(&self) -> &Translator {
        &self.services.translator
    }

    pub fn state(&self) -> &SharedStateStore {
        &self.services.state
    }

    pub fn t(&self, key: &str) -> String {
        self.services.translator.t(key, &self.language)
    }

    pub fn t_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        self.services.translator.t_args(key, &self.language, args)
    }

    pub async fn send(&self, text: &str, keyboard: Option<Keyboard>) -> AppResult<i32> {
        self.services
            .outbound
            .send(self.chat_id(), text, keyboard)
            .await
    }

    /// Edit the message a callback came from, or send a new one
    pub async fn show(&self, text: &str, keyboard: Option<Keyboard>) -> AppResult<()> {
        match (self.event.is_callback(), self.event.message_id) {
            (true, Some(message_id)) => {
                self.services
                    .outbound
                    .edit(self.chat_id(), message_id, text, keyboard)
                    .await
            }
            _ => self.send(text, keyboard).await.map(|_| ()),
        }
    }

    /// Delete the message the event refers to; failures are only logged
    pub async fn delete_current(&self) {
        if let Some(message_id) = self.event.message_id {
            if let Err(e) = self
                .services
                .outbound
                .delete(self.chat_id(), message_id)
                .await
            {
                tracing::debug!(user_id = %self.user_id(), error = %e, "Failed to delete message");
            }
        }
    }

    /// City directory, served from cache when fresh
    pub async fn city_list(&self) -> AppResult<Arc<Vec<City>>> {
        if let Some(cities) = self.services.cache.city_list() {
            return Ok(cities);
        }
        let cities = self.services.cities.list_cities().await?;
        Ok(self.services.cache.store_city_list(cities))
    }

    /// Localized name of a city slug
    pub async fn city_name(&self, slug: &str) -> AppResult<String> {
        let cities = self.city_list().await?;
        Ok(cities
            .iter()
            .find(|c| c.title == slug)
            .map(|c| c.name(&self.language).to_string())
            .unwrap_or_else(|| slug.to_string()))
    }

    /// Name to greet the user with: passenger profile, else Telegram name
    pub async fn display_name(&self) -> AppResult<String> {
        let passenger = self.services.backend.get_passenger(self.user_id()).await?;
        Ok(self.greeting_name(passenger.as_ref()))
    }

    pub fn greeting_name(&self, passenger: Option<&Passenger>) -> String {
        passenger
            .map(|p| p.full_name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.event.full_name.clone())
    }
}
