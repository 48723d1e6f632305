//! # Conversation State Store
//!
//! Keeps the [`ConversationState`] of every user behind the [`StateStore`]
//! trait. Two implementations are provided: an in-memory map for local runs
//! and tests, and Redis for deployments where state must survive restarts.
//!
//! The store does not serialize writers itself. The dispatcher holds a
//! per-user lock around each handler, which makes every read-modify-write
//! below atomic for that user.

use crate::dialogue::{ConversationState, Step, StepData};
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const KEY_PREFIX: &str = "state:";

/// Redis key for a user's conversation state
pub fn state_key(user_id: i64) -> String {
    format!("{}{}", KEY_PREFIX, user_id)
}

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Current state; idle when nothing is stored
    async fn get_state(&self, user_id: i64) -> AppResult<ConversationState>;

    /// Persist a whole state. An idle state removes the entry.
    async fn save_state(&self, user_id: i64, state: &ConversationState) -> AppResult<()>;

    /// Back to the "no active flow" baseline
    async fn clear(&self, user_id: i64) -> AppResult<()>;

    /// Number of users with an active step
    async fn active_conversations(&self) -> AppResult<usize>;

    /// Connectivity check for `/health`
    async fn ping(&self) -> AppResult<()>;

    async fn get_step(&self, user_id: i64) -> AppResult<Option<Step>> {
        Ok(self.get_state(user_id).await?.step)
    }

    async fn get_data(&self, user_id: i64) -> AppResult<StepData> {
        Ok(self.get_state(user_id).await?.data)
    }

    /// Activate `step` and merge `merge_data` into the existing data
    async fn set_step(&self, user_id: i64, step: Step, merge_data: StepData) -> AppResult<()> {
        let mut state = self.get_state(user_id).await?;
        state.step = Some(step);
        state.data.extend(merge_data);
        self.save_state(user_id, &state).await
    }

    /// Activate `step` with exactly `data`, dropping everything else
    async fn replace(&self, user_id: i64, step: Step, data: StepData) -> AppResult<()> {
        self.save_state(user_id, &ConversationState::new(step, data))
            .await
    }
}

/// Shared handle passed to handlers
pub type SharedStateStore = Arc<dyn StateStore>;

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    states: RwLock<HashMap<i64, ConversationState>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get_state(&self, user_id: i64) -> AppResult<ConversationState> {
        Ok(self
            .states
            .read()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_state(&self, user_id: i64, state: &ConversationState) -> AppResult<()> {
        let mut states = self.states.write();
        if state.is_idle() {
            states.remove(&user_id);
        } else {
            states.insert(user_id, state.clone());
        }
        Ok(())
    }

    async fn clear(&self, user_id: i64) -> AppResult<()> {
        self.states.write().remove(&user_id);
        Ok(())
    }

    async fn active_conversations(&self) -> AppResult<usize> {
        Ok(self.states.read().len())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Redis-backed store: JSON under `state:<user_id>` with an idle TTL
#[derive(Clone)]
pub struct RedisStateStore {
    connection: redis::aio::MultiplexedConnection,
    ttl_secs: u64,
    command_timeout: Duration,
}

impl RedisStateStore {
    /// Connect and verify the server answers `PING`
    pub async fn connect(url: &str, ttl_secs: u64, command_timeout: Duration) -> AppResult<Self> {
        let client = redis::Client::open(url)?;
        let connection = tokio::time::timeout(
            command_timeout,
            client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| AppError::StateStore("Timed out connecting to Redis".to_string()))??;

        let store = Self {
            connection,
            ttl_secs,
            command_timeout,
        };
        store.ping().await?;

        tracing::info!(ttl_secs = ttl_secs, "Connected to Redis state store");
        Ok(store)
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> AppResult<T>
    where
        F: std::future::Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.command_timeout, fut).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => Err(AppError::StateStore(format!(
                "Redis {} timed out after {:?}",
                operation, self.command_timeout
            ))),
        }
    }
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn get_state(&self, user_id: i64) -> AppResult<ConversationState> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = self.bounded("GET", conn.get(state_key(user_id))).await?;

        match raw {
            Some(json) => match serde_json::from_str(&json) {
                Ok(state) => Ok(state),
                Err(e) => {
                    // unreadable or from an older schema; start over
                    tracing::warn!(user_id = %user_id, error = %e, "Discarding unreadable conversation state");
                    Ok(ConversationState::default())
                }
            },
            None => Ok(ConversationState::default()),
        }
    }

    async fn save_state(&self, user_id: i64, state: &ConversationState) -> AppResult<()> {
        if state.is_idle() {
            return self.clear(user_id).await;
        }

        let json = serde_json::to_string(state)?;
        let mut conn = self.connection.clone();
        self.bounded::<(), _>("SETEX", conn.set_ex(state_key(user_id), json, self.ttl_secs))
            .await
    }

    async fn clear(&self, user_id: i64) -> AppResult<()> {
        let mut conn = self.connection.clone();
        self.bounded::<(), _>("DEL", conn.del(state_key(user_id))).await
    }

    async fn active_conversations(&self) -> AppResult<usize> {
        let mut conn = self.connection.clone();
        let keys: Vec<String> = self
            .bounded(
                "KEYS",
                redis::cmd("KEYS")
                    .arg(format!("{}*", KEY_PREFIX))
                    .query_async(&mut conn),
            )
            .await?;
        Ok(keys.len())
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: String = self
            .bounded("PING", redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(())
    }
}
