use anyhow::Result;
use ride_bot::backend::{BackendClient, SharedCityDirectory, SharedGeocoder, SharedRideBackend};
use ride_bot::bot::outbound::{SharedOutbound, TelegramOutbound};
use ride_bot::bot::{self, telegram, DispatchStats, Dispatcher as EventDispatcher, Services};
use ride_bot::cache::CacheManager;
use ride_bot::config::AppConfig;
use ride_bot::errors::error_logging;
use ride_bot::localization::Translator;
use ride_bot::observability;
use ride_bot::server::{self, AppState};
use ride_bot::state_store::{InMemoryStateStore, RedisStateStore, SharedStateStore};
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tracing::{error, info, warn};

const REDIS_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);
const CACHE_CLEANUP_INTERVAL: Duration = Duration::from_secs(120);

async fn connect_state_store(config: &AppConfig) -> Result<SharedStateStore> {
    match &config.storage.redis_url {
        Some(url) => {
            let store =
                RedisStateStore::connect(url, config.storage.state_ttl_secs, REDIS_COMMAND_TIMEOUT)
                    .await?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("REDIS_URL not set, conversation state is kept in memory only");
            Ok(Arc::new(InMemoryStateStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    observability::init_tracing(config.server.debug)?;
    if let Err(e) = config.validate() {
        error_logging::log_config_error(&e, "app_config", "validate");
        return Err(e.into());
    }
    info!("{}", config.summary());

    let metrics_handle = observability::init_metrics()?;

    // Startup failures below are fatal
    let translator = Arc::new(Translator::load(&config.localization)?);
    let state_store = connect_state_store(&config).await?;

    let backend_client = Arc::new(BackendClient::new(&config.backend)?);
    let backend: SharedRideBackend = backend_client.clone();
    let cities: SharedCityDirectory = backend_client.clone();
    let geocoder: SharedGeocoder = backend_client;

    // Initialize the bot with custom client configuration for better reliability
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.backend.http_timeout_secs))
        .build()?;
    let tg = Bot::with_client(config.bot.token.clone(), client);
    let outbound: SharedOutbound = Arc::new(TelegramOutbound::new(tg.clone()));

    let registry = bot::build_registry()?;
    if let Err(e) = telegram::setup_bot_commands(&tg, &registry).await {
        warn!(error = %e, "Failed to publish bot commands");
    }

    let services = Arc::new(Services {
        config: config.clone(),
        translator: Arc::clone(&translator),
        state: Arc::clone(&state_store),
        backend,
        cities,
        geocoder,
        outbound: Arc::clone(&outbound),
        cache: CacheManager::new(),
        stats: Arc::new(DispatchStats::default()),
    });

    let cache_services = Arc::clone(&services);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CACHE_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            cache_services.cache.cleanup_all();
        }
    });

    let event_dispatcher = Arc::new(EventDispatcher::new(registry, services));

    let http_state = AppState::new(translator, outbound, state_store, Some(metrics_handle));
    let server_config = config.server.clone();
    tokio::spawn(async move {
        if let Err(e) = server::serve(&server_config, http_state).await {
            error!(error = %e, "HTTP server stopped");
        }
    });

    info!(
        timeout_secs = config.backend.http_timeout_secs,
        "Bot initialized, starting dispatcher"
    );

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(telegram::message_endpoint))
        .branch(Update::filter_callback_query().endpoint(telegram::callback_endpoint));

    Dispatcher::builder(tg, handler)
        .dependencies(dptree::deps![event_dispatcher])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
