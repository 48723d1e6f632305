//! # Unified Application Configuration
//!
//! All settings are loaded once at startup from environment variables
//! (after `dotenvy` has populated them from `.env`) and validated before the
//! bot accepts any update. Every section exposes `validate()` so a partially
//! configured process never starts.

use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Bot-specific configuration settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    /// Telegram bot token
    pub token: String,
    /// Telegram user ids allowed to run admin-only handlers
    pub admin_ids: Vec<i64>,
}

impl BotConfig {
    /// Validate bot configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.token.trim().is_empty() {
            return Err(AppError::Config("Bot token cannot be empty".to_string()));
        }

        let parts: Vec<&str> = self.token.split(':').collect();
        if parts.len() != 2 {
            return Err(AppError::Config(
                "Bot token format is invalid. Expected format: 'bot_id:bot_token'".to_string(),
            ));
        }

        if parts[0].parse::<u64>().is_err() {
            return Err(AppError::Config(
                "Bot token bot ID must be numeric".to_string(),
            ));
        }

        if parts[1].len() < 20 {
            return Err(AppError::Config(
                "Bot token appears to be too short. Please verify it's a valid token".to_string(),
            ));
        }

        Ok(())
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

/// Backend REST API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL, e.g. `https://api.example.uz`
    pub base_url: String,
    /// Sent as `Authorization: Token <token>` when present
    pub auth_token: Option<String>,
    /// Path prefix appended to the base URL
    pub api_version: String,
    /// HTTP client timeout in seconds
    pub http_timeout_secs: u64,
    /// Retries for idempotent GET requests
    pub max_retries: u32,
    /// Consecutive failures before the circuit opens
    pub circuit_breaker_threshold: u32,
    /// Seconds before an open circuit lets a request through again
    pub circuit_breaker_reset_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth_token: None,
            api_version: "api/v1".to_string(),
            http_timeout_secs: 30,
            max_retries: 2,
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60,
        }
    }
}

impl BackendConfig {
    /// Validate backend configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(AppError::Config("Backend URL cannot be empty".to_string()));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(AppError::Config(
                "Backend URL must start with 'http://' or 'https://'".to_string(),
            ));
        }

        if self.http_timeout_secs == 0 {
            return Err(AppError::Config("HTTP timeout cannot be 0".to_string()));
        }

        if self.http_timeout_secs > 300 {
            return Err(AppError::Config(
                "HTTP timeout cannot be greater than 300 seconds".to_string(),
            ));
        }

        if self.max_retries > 10 {
            return Err(AppError::Config(
                "Backend max retries cannot be greater than 10".to_string(),
            ));
        }

        if self.circuit_breaker_threshold == 0 {
            return Err(AppError::Config(
                "Circuit breaker threshold cannot be 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Versioned API root without a trailing slash
    pub fn api_root(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.api_version.trim_matches('/')
        )
    }
}

/// Conversation state storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Redis connection string; the in-memory store is used when absent
    pub redis_url: Option<String>,
    /// Expiry of an idle conversation in seconds
    pub state_ttl_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            state_ttl_secs: 86_400,
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(url) = &self.redis_url {
            if !url.starts_with("redis://") && !url.starts_with("rediss://") {
                return Err(AppError::Config(
                    "Redis URL must start with 'redis://' or 'rediss://'".to_string(),
                ));
            }
        }

        if self.state_ttl_secs == 0 {
            return Err(AppError::Config("State TTL cannot be 0".to_string()));
        }

        Ok(())
    }
}

/// HTTP server for the notification webhook, health and metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Verbose logging and pretty output
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8888,
            debug: false,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.host.trim().is_empty() {
            return Err(AppError::Config("Server host cannot be empty".to_string()));
        }

        if self.port == 0 {
            return Err(AppError::Config("Server port cannot be 0".to_string()));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Translation files and fuzzy label matching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalizationConfig {
    /// Directory containing `{lang}/main.ftl`
    pub locales_path: String,
    pub supported_languages: Vec<String>,
    pub default_language: String,
    /// Minimum similarity for slug detection
    pub slug_threshold: f64,
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            locales_path: "./locales".to_string(),
            supported_languages: vec!["en".to_string(), "uz".to_string(), "ru".to_string()],
            default_language: "en".to_string(),
            slug_threshold: 0.8,
        }
    }
}

impl LocalizationConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.supported_languages.is_empty() {
            return Err(AppError::Config(
                "At least one supported language is required".to_string(),
            ));
        }

        if !self.supported_languages.contains(&self.default_language) {
            return Err(AppError::Config(format!(
                "Default language '{}' is not in SUPPORTED_LANGUAGES",
                self.default_language
            )));
        }

        if !(0.0..=1.0).contains(&self.slug_threshold) || self.slug_threshold == 0.0 {
            return Err(AppError::Config(
                "Slug threshold must be in (0.0, 1.0]".to_string(),
            ));
        }

        Ok(())
    }
}

/// Dispatcher and booking-flow tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Minimum interval between accepted callbacks per user
    pub callback_rate_limit_ms: u64,
    /// Maximum distance from an allowed city for GPS locations
    pub service_radius_km: f64,
    /// Origin and destination closer than this are the same place
    pub same_city_distance_km: f64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            callback_rate_limit_ms: 1000,
            service_radius_km: 45.0,
            same_city_distance_km: 50.0,
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.service_radius_km <= 0.0 {
            return Err(AppError::Config(
                "Service radius must be positive".to_string(),
            ));
        }

        if self.same_city_distance_km < 0.0 {
            return Err(AppError::Config(
                "Same-city distance cannot be negative".to_string(),
            ));
        }

        if self.callback_rate_limit_ms > 60_000 {
            return Err(AppError::Config(
                "Callback rate limit cannot be greater than 60 seconds".to_string(),
            ));
        }

        Ok(())
    }
}

/// Unified application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub backend: BackendConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub localization: LocalizationConfig,
    pub dispatch: DispatchConfig,
}

/// Read an optional variable, parsing it when set
fn env_parse<T: FromStr>(key: &str, default: T) -> AppResult<T> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} must be a valid value", key))),
        _ => Ok(default),
    }
}

fn env_required(key: &str) -> AppResult<String> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("{} environment variable is required", key)))
}

fn env_flag(key: &str) -> bool {
    matches!(
        env::var(key).unwrap_or_default().to_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Split a comma separated list, dropping blanks
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse `ADMIN_IDS` style lists of numeric ids
pub fn parse_admin_ids(raw: &str) -> AppResult<Vec<i64>> {
    split_list(raw)
        .iter()
        .map(|id| {
            id.parse::<i64>()
                .map_err(|_| AppError::Config(format!("ADMIN_IDS contains invalid id '{}'", id)))
        })
        .collect()
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        config.bot.token = env_required("TELEGRAM_BOT_TOKEN")?;
        config.bot.admin_ids = parse_admin_ids(&env::var("ADMIN_IDS").unwrap_or_default())?;

        config.backend.base_url = env_required("BACKEND_URL")?;
        config.backend.auth_token = env::var("BACKEND_AUTH_TOKEN")
            .or_else(|_| env::var("AUTH_TOKEN"))
            .ok()
            .filter(|t| !t.trim().is_empty());
        config.backend.api_version = env_parse("API_VERSION", config.backend.api_version)?;
        config.backend.http_timeout_secs =
            env_parse("HTTP_CLIENT_TIMEOUT_SECS", config.backend.http_timeout_secs)?;
        config.backend.max_retries = env_parse("BACKEND_MAX_RETRIES", config.backend.max_retries)?;
        config.backend.circuit_breaker_threshold = env_parse(
            "CIRCUIT_BREAKER_THRESHOLD",
            config.backend.circuit_breaker_threshold,
        )?;
        config.backend.circuit_breaker_reset_secs = env_parse(
            "CIRCUIT_BREAKER_RESET_SECS",
            config.backend.circuit_breaker_reset_secs,
        )?;

        config.storage.redis_url = env::var("REDIS_URL").ok().filter(|u| !u.trim().is_empty());
        config.storage.state_ttl_secs = env_parse("STATE_TTL_SECS", config.storage.state_ttl_secs)?;

        config.server.host = env_parse("HOST", config.server.host)?;
        config.server.port = env_parse("PORT", config.server.port)?;
        config.server.debug = env_flag("DEBUG");

        config.localization.locales_path =
            env_parse("LOCALES_PATH", config.localization.locales_path)?;
        if let Ok(raw) = env::var("SUPPORTED_LANGUAGES") {
            let languages = split_list(&raw);
            if !languages.is_empty() {
                config.localization.supported_languages = languages;
            }
        }
        config.localization.default_language =
            env_parse("DEFAULT_LANGUAGE", config.localization.default_language)?;
        config.localization.slug_threshold =
            env_parse("SLUG_THRESHOLD", config.localization.slug_threshold)?;

        config.dispatch.callback_rate_limit_ms =
            env_parse("CALLBACK_RATE_LIMIT_MS", config.dispatch.callback_rate_limit_ms)?;
        config.dispatch.service_radius_km =
            env_parse("SERVICE_RADIUS_KM", config.dispatch.service_radius_km)?;
        config.dispatch.same_city_distance_km =
            env_parse("SAME_CITY_DISTANCE_KM", config.dispatch.same_city_distance_km)?;

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.bot.validate()?;
        self.backend.validate()?;
        self.storage.validate()?;
        self.server.validate()?;
        self.localization.validate()?;
        self.dispatch.validate()?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: bot_token=[REDACTED], backend={}, state_store={}, bind={}, languages={}, admins={}",
            self.backend.api_root(),
            if self.storage.redis_url.is_some() { "redis" } else { "memory" },
            self.server.bind_address(),
            self.localization.supported_languages.join(","),
            self.bot.admin_ids.len()
        )
    }
}
