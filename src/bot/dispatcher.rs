//! # Dispatcher
//!
//! The handler registry is built once at startup from explicit
//! [`RegistryBuilder::register`] calls and is immutable afterwards.
//! [`Dispatcher::dispatch`] routes one [`InboundEvent`] to at most one
//! handler, using this precedence:
//!
//! 1. the handler of the user's current conversation step, when it accepts
//!    the event;
//! 2. the longest matching callback prefix;
//! 3. the command name;
//! 4. the content type (text, contact, location).
//!
//! Events nothing matches are dropped silently. Each user's events run one at
//! a time under a per-user async mutex, so state read-modify-write sequences
//! never interleave for the same user. Handler errors and panics are caught
//! here and turned into a generic reply.

use super::events::{EventKind, InboundEvent};
use super::{DispatchStats, HandlerContext, Services};
use crate::dialogue::Step;
use crate::errors::{error_logging, AppError, AppResult};
use crate::observability;
use crate::rate_limiter::RateLimiter;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, Instrument};

pub type HandlerFuture = BoxFuture<'static, anyhow::Result<()>>;
pub type HandlerFn = Arc<dyn Fn(HandlerContext) -> HandlerFuture + Send + Sync>;

/// Wrap an async fn into a [`HandlerFn`]
pub fn handler<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(HandlerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |ctx| f(ctx).boxed())
}

/// Registration key: kind plus selector
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Command(String),
    /// Callback data prefix, matched on `:` boundaries
    Callback(String),
    Step(Step),
    Content(EventKind),
}

impl Route {
    pub fn command(name: &str) -> Self {
        Route::Command(name.to_lowercase())
    }

    pub fn callback(prefix: &str) -> Self {
        Route::Callback(prefix.to_string())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Route::Command(_) => "command",
            Route::Callback(_) => "callback",
            Route::Step(_) => "step",
            Route::Content(_) => "content",
        }
    }
}

/// Per-handler metadata
#[derive(Clone, Debug, Default)]
pub struct HandlerMeta {
    /// Handler identity for logs and metrics
    pub name: &'static str,
    pub admin_only: bool,
    /// Overrides the default window; `Duration::ZERO` disables throttling
    pub rate_limit: Option<Duration>,
    /// Shown in the client's command menu (commands only)
    pub description: Option<&'static str>,
    /// Event kinds a step handler takes
    pub accepts: Vec<EventKind>,
    /// Callback prefixes a step handler takes; empty accepts every callback
    pub callback_prefixes: Vec<&'static str>,
}

impl HandlerMeta {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    pub fn admin_only(mut self) -> Self {
        self.admin_only = true;
        self
    }

    pub fn rate_limit(mut self, window: Duration) -> Self {
        self.rate_limit = Some(window);
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    pub fn accepts(mut self, kinds: &[EventKind]) -> Self {
        self.accepts = kinds.to_vec();
        self
    }

    pub fn callbacks(mut self, prefixes: &[&'static str]) -> Self {
        self.callback_prefixes = prefixes.to_vec();
        if !self.accepts.contains(&EventKind::Callback) {
            self.accepts.push(EventKind::Callback);
        }
        self
    }
}

pub struct Registration {
    pub handler: HandlerFn,
    pub meta: HandlerMeta,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration").field("meta", &self.meta).finish()
    }
}

/// `data` equals `prefix` or continues it after a `:`
fn prefix_matches(data: &str, prefix: &str) -> bool {
    if data == prefix {
        return true;
    }
    data.starts_with(prefix) && (prefix.ends_with(':') || data[prefix.len()..].starts_with(':'))
}

/// Collects registrations; conflicts surface here, at startup
#[derive(Default, Debug)]
pub struct RegistryBuilder {
    entries: HashMap<Route, Registration>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one handler. Registering the same route twice is an error.
    pub fn register(
        &mut self,
        route: Route,
        handler: HandlerFn,
        meta: HandlerMeta,
    ) -> AppResult<&mut Self> {
        if let Some(existing) = self.entries.get(&route) {
            return Err(AppError::Config(format!(
                "Handler conflict: {:?} already registered by '{}', cannot register '{}'",
                route, existing.meta.name, meta.name
            )));
        }
        self.entries.insert(route, Registration { handler, meta });
        Ok(self)
    }

    pub fn build(self) -> Registry {
        let mut registry = Registry::default();
        for (route, registration) in self.entries {
            match route {
                Route::Command(name) => {
                    registry.commands.insert(name, registration);
                }
                Route::Callback(prefix) => registry.callbacks.push((prefix, registration)),
                Route::Step(step) => {
                    registry.steps.insert(step, registration);
                }
                Route::Content(kind) => {
                    registry.content.insert(kind, registration);
                }
            }
        }
        // longest prefix first
        registry
            .callbacks
            .sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        registry
    }
}

/// Immutable dispatch tables
#[derive(Default, Debug)]
pub struct Registry {
    commands: HashMap<String, Registration>,
    callbacks: Vec<(String, Registration)>,
    steps: HashMap<Step, Registration>,
    content: HashMap<EventKind, Registration>,
}

impl Registry {
    pub fn len(&self) -> usize {
        self.commands.len() + self.callbacks.len() + self.steps.len() + self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn step_accepts(registration: &Registration, event: &InboundEvent) -> bool {
        let meta = &registration.meta;
        if !meta.accepts.contains(&event.kind()) {
            return false;
        }
        match event.callback_data() {
            Some(data) => {
                meta.callback_prefixes.is_empty()
                    || meta.callback_prefixes.iter().any(|p| prefix_matches(data, p))
            }
            None => true,
        }
    }

    /// Best handler for `event` given the user's current `step`
    pub fn resolve(&self, event: &InboundEvent, step: Option<Step>) -> Option<&Registration> {
        if let Some(registration) = step.and_then(|s| self.steps.get(&s)) {
            if Self::step_accepts(registration, event) {
                return Some(registration);
            }
        }

        if let Some(data) = event.callback_data() {
            return self
                .callbacks
                .iter()
                .find(|(prefix, _)| prefix_matches(data, prefix))
                .map(|(_, registration)| registration);
        }

        if let Some(name) = event.command() {
            return self.commands.get(name);
        }

        self.content.get(&event.kind())
    }

    /// Non-admin commands with a description, sorted by name
    pub fn public_commands(&self) -> Vec<(String, &'static str)> {
        let mut commands: Vec<(String, &'static str)> = self
            .commands
            .iter()
            .filter(|(_, r)| !r.meta.admin_only)
            .filter_map(|(name, r)| r.meta.description.map(|d| (name.clone(), d)))
            .collect();
        commands.sort();
        commands
    }
}

/// What happened to a dispatched event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    Failed,
    NoHandler,
    RateLimited,
    Forbidden,
}

pub struct Dispatcher {
    registry: Registry,
    services: Arc<Services>,
    rate_limiter: RateLimiter,
    user_locks: parking_lot::Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
    callback_window: Duration,
}

impl Dispatcher {
    pub fn new(registry: Registry, services: Arc<Services>) -> Self {
        let callback_window =
            Duration::from_millis(services.config.dispatch.callback_rate_limit_ms);
        services
            .stats
            .registered_handlers
            .store(registry.len(), Ordering::Relaxed);

        info!(
            handlers = registry.len(),
            callback_window_ms = callback_window.as_millis() as u64,
            "Dispatcher ready"
        );

        Self {
            registry,
            services,
            rate_limiter: RateLimiter::default(),
            user_locks: parking_lot::Mutex::new(HashMap::new()),
            callback_window,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    fn stats(&self) -> &DispatchStats {
        &self.services.stats
    }

    /// Route one event. Never fails; every problem is logged and counted.
    pub async fn dispatch(&self, event: InboundEvent) -> DispatchOutcome {
        let kind = event.kind();
        observability::record_event(kind.as_str());
        let span = observability::telegram_span(kind.as_str(), event.user_id);

        async move {
            let user_id = event.user_id;
            let arrived = Instant::now();
            let lock = self.user_lock(user_id);
            let outcome = {
                let _guard = lock.lock().await;
                self.dispatch_locked(event, arrived).await
            };
            self.release_user_lock(user_id, lock);
            outcome
        }
        .instrument(span)
        .await
    }

    fn user_lock(&self, user_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        self.user_locks
            .lock()
            .entry(user_id)
            .or_default()
            .clone()
    }

    /// Drop the user's lock from the map once nobody else holds or waits on it
    fn release_user_lock(&self, user_id: i64, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.user_locks.lock();
        // the map and `lock` itself
        if Arc::strong_count(&lock) <= 2 {
            locks.remove(&user_id);
        }
    }

    async fn dispatch_locked(&self, event: InboundEvent, arrived: Instant) -> DispatchOutcome {
        let user_id = event.user_id;
        let kind = event.kind();

        let step = match self.services.state.get_step(user_id).await {
            Ok(step) => step,
            Err(e) => {
                error_logging::log_state_error(&e, "get_step", user_id);
                self.answer_callback(&event).await;
                let language = self
                    .services
                    .translator
                    .resolve_language(event.language_code.as_deref());
                self.send_failure(&event, &language, true).await;
                DispatchStats::incr(&self.stats().failed);
                return DispatchOutcome::Failed;
            }
        };

        let Some(registration) = self.registry.resolve(&event, step) else {
            debug!(user_id = %user_id, kind = %kind, step = ?step, "No handler matched, dropping event");
            observability::record_dropped_event("no_handler");
            DispatchStats::incr(&self.stats().dropped);
            self.answer_callback(&event).await;
            return DispatchOutcome::NoHandler;
        };
        let meta = &registration.meta;

        let window = match meta.rate_limit {
            Some(window) => Some(window),
            None if event.is_callback() => Some(self.callback_window),
            None => None,
        };
        if let Some(window) = window.filter(|w| !w.is_zero()) {
            if !self.rate_limiter.check(user_id, window, arrived) {
                debug!(user_id = %user_id, handler = %meta.name, "Rate limited, dropping event");
                observability::record_dropped_event("rate_limited");
                DispatchStats::incr(&self.stats().rate_limited);
                self.answer_callback(&event).await;
                return DispatchOutcome::RateLimited;
            }
        }

        self.answer_callback(&event).await;
        let language = self.resolve_language(&event).await;

        if meta.admin_only && !self.services.config.bot.is_admin(user_id) {
            info!(user_id = %user_id, handler = %meta.name, "Non-admin tried an admin-only handler");
            let text = self.services.translator.t("errors-admin-only", &language);
            if let Err(e) = self.services.outbound.send(event.chat_id, &text, None).await {
                debug!(user_id = %user_id, error = %e, "Failed to send admin-only notice");
            }
            return DispatchOutcome::Forbidden;
        }

        let ctx = HandlerContext {
            event: event.clone(),
            services: Arc::clone(&self.services),
            language: language.clone(),
            step,
        };

        debug!(user_id = %user_id, handler = %meta.name, step = ?step, "Invoking handler");
        let start = Instant::now();
        let result = AssertUnwindSafe((registration.handler)(ctx))
            .catch_unwind()
            .await;
        let duration = start.elapsed();

        match result {
            Ok(Ok(())) => {
                observability::record_handler_metrics(meta.name, true, duration);
                DispatchStats::incr(&self.stats().handled);
                DispatchOutcome::Handled
            }
            Ok(Err(err)) => {
                observability::record_handler_metrics(meta.name, false, duration);
                error_logging::log_handler_error(
                    &format!("{:#}", err),
                    meta.name,
                    user_id,
                    kind.as_str(),
                );
                let collaborator = err
                    .downcast_ref::<AppError>()
                    .is_some_and(AppError::is_collaborator_failure);
                self.send_failure(&event, &language, collaborator).await;
                DispatchStats::incr(&self.stats().failed);
                DispatchOutcome::Failed
            }
            Err(panic) => {
                observability::record_handler_metrics(meta.name, false, duration);
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error_logging::log_handler_error(
                    &format!("panic: {}", message),
                    meta.name,
                    user_id,
                    kind.as_str(),
                );
                self.send_failure(&event, &language, false).await;
                DispatchStats::incr(&self.stats().failed);
                DispatchOutcome::Failed
            }
        }
    }

    /// Cached language, then the backend profile, then the client's language
    async fn resolve_language(&self, event: &InboundEvent) -> String {
        let services = &self.services;
        if let Some(language) = services.cache.language(event.user_id) {
            return language;
        }

        match services.backend.get_user(event.user_id).await {
            Ok(Some(user)) if services.translator.is_supported(&user.language) => {
                services.cache.store_language(event.user_id, &user.language);
                user.language
            }
            Ok(_) => services
                .translator
                .resolve_language(event.language_code.as_deref()),
            Err(e) => {
                tracing::warn!(user_id = %event.user_id, error = %e, "Falling back to client language");
                services
                    .translator
                    .resolve_language(event.language_code.as_deref())
            }
        }
    }

    async fn answer_callback(&self, event: &InboundEvent) {
        if let Some(id) = event.callback_id() {
            if let Err(e) = self.services.outbound.answer_callback(id, None).await {
                debug!(user_id = %event.user_id, error = %e, "Failed to answer callback");
            }
        }
    }

    async fn send_failure(&self, event: &InboundEvent, language: &str, collaborator: bool) {
        let key = if collaborator {
            "errors-service-unavailable"
        } else {
            "errors-something-went-wrong"
        };
        let text = self.services.translator.t(key, language);
        if let Err(e) = self.services.outbound.send(event.chat_id, &text, None).await {
            tracing::warn!(user_id = %event.user_id, error = %e, "Failed to deliver failure notice");
        }
    }
}
