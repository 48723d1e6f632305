//! Shared fakes and fixtures for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use ride_bot::backend::models::{
    BackendUser, City, CreatedOrder, NewPassenger, NewPost, NewTravel, NewUser, Order,
    OrderStatus, Passenger, PlaceRef, SmsChallenge,
};
use ride_bot::backend::{CityDirectory, Geocoder, RideBackend};
use ride_bot::bot::events::{EventPayload, InboundEvent};
use ride_bot::bot::outbound::ChatOutbound;
use ride_bot::bot::ui_builder::Keyboard;
use ride_bot::bot::{
    build_registry, DispatchOutcome, DispatchStats, Dispatcher, Registry, Services,
};
use ride_bot::cache::CacheManager;
use ride_bot::config::{AppConfig, LocalizationConfig};
use ride_bot::errors::{AppError, AppResult};
use ride_bot::geo::GeoPoint;
use ride_bot::localization::Translator;
use ride_bot::state_store::{InMemoryStateStore, StateStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, Ordering};
use std::sync::Arc;

pub const USER: i64 = 1001;
pub const ADMIN: i64 = 9;
pub const SMS_CODE: &str = "4321";

pub fn city(title: &str, names: &[(&str, &str)], point: Option<(f64, f64)>) -> City {
    City {
        id: 0,
        title: title.to_string(),
        translate: names
            .iter()
            .map(|(lang, name)| (lang.to_string(), name.to_string()))
            .collect(),
        is_allowed: true,
        subcategory: None,
        latitude: point.map(|p| p.0),
        longitude: point.map(|p| p.1),
    }
}

/// Three allowed cities with coordinates, one disallowed, one district
pub fn fixture_cities() -> Vec<City> {
    let mut bukhara = city("bukhara", &[("en", "Bukhara")], Some((39.7747, 64.4286)));
    bukhara.is_allowed = false;
    let mut chilonzor = city("chilonzor", &[("en", "Chilonzor")], Some((41.2756, 69.2034)));
    chilonzor.subcategory = Some("tashkent".to_string());

    vec![
        city(
            "tashkent",
            &[("en", "Tashkent"), ("ru", "Ташкент"), ("uz", "Toshkent")],
            Some((41.2995, 69.2401)),
        ),
        city(
            "qoqon",
            &[("en", "Kokand"), ("ru", "Коканд"), ("uz", "Qo'qon")],
            Some((40.5286, 70.9425)),
        ),
        city(
            "fargona",
            &[("en", "Fergana"), ("ru", "Фергана"), ("uz", "Farg'ona")],
            Some((40.3894, 71.7830)),
        ),
        bukhara,
        chilonzor,
    ]
}

pub fn locales_config() -> LocalizationConfig {
    LocalizationConfig {
        locales_path: concat!(env!("CARGO_MANIFEST_DIR"), "/locales").to_string(),
        ..LocalizationConfig::default()
    }
}

pub fn translator() -> Arc<Translator> {
    Arc::new(Translator::load(&locales_config()).expect("locales load"))
}

/// In-memory backend: users, passengers, orders, cities and geocoding
#[derive(Default)]
pub struct FakeBackend {
    pub users: Mutex<HashMap<i64, BackendUser>>,
    pub passengers: Mutex<HashMap<i64, Passenger>>,
    pub orders: Mutex<Vec<Order>>,
    pub travels: Mutex<Vec<NewTravel>>,
    pub posts: Mutex<Vec<NewPost>>,
    pub status_updates: Mutex<Vec<(i64, OrderStatus)>>,
    pub rates: Mutex<Vec<(i64, u8)>>,
    pub sms_requests: Mutex<Vec<String>>,
    pub cities: Mutex<Vec<City>>,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
    next_id: AtomicI64,
}

impl FakeBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        *backend.cities.lock() = fixture_cities();
        backend.next_id.store(500, Ordering::SeqCst);
        backend
    }

    /// A registered user with a verified phone
    pub fn with_passenger(self, telegram_id: i64, language: &str) -> Self {
        self.users.lock().insert(
            telegram_id,
            BackendUser {
                telegram_id,
                username: None,
                full_name: "Aziz".to_string(),
                language: language.to_string(),
                is_banned: false,
            },
        );
        self.passengers.lock().insert(
            telegram_id,
            Passenger {
                id: 1,
                telegram_id,
                full_name: "Aziz".to_string(),
                phone: Some("+998901234567".to_string()),
                total_rides: 0,
            },
        );
        self
    }

    pub fn add_order(&self, id: i64, status: OrderStatus) {
        self.orders.lock().push(Order {
            id,
            status,
            from_location: None,
            to_location: None,
            price: Some(200_000),
            created_at: Some("2024-03-05T14:07:00+05:00".to_string()),
        });
    }

    pub fn add_order_between(&self, id: i64, status: OrderStatus, from: &str, to: &str) {
        self.add_order(id, status);
        if let Some(order) = self.orders.lock().last_mut() {
            order.from_location = Some(PlaceRef::Name(from.to_string()));
            order.to_location = Some(PlaceRef::Name(to.to_string()));
        }
    }

    fn check_write(&self) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Backend("backend unreachable".to_string()));
        }
        Ok(())
    }

    fn check_read(&self) -> AppResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Backend("backend unreachable".to_string()));
        }
        Ok(())
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl RideBackend for FakeBackend {
    async fn get_user(&self, telegram_id: i64) -> AppResult<Option<BackendUser>> {
        self.check_read()?;
        Ok(self.users.lock().get(&telegram_id).cloned())
    }

    async fn create_user(&self, user: &NewUser) -> AppResult<BackendUser> {
        self.check_write()?;
        let created = BackendUser {
            telegram_id: user.telegram_id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            language: user.language.clone(),
            is_banned: false,
        };
        self.users.lock().insert(user.telegram_id, created.clone());
        Ok(created)
    }

    async fn update_user_language(&self, telegram_id: i64, language: &str) -> AppResult<()> {
        self.check_write()?;
        if let Some(user) = self.users.lock().get_mut(&telegram_id) {
            user.language = language.to_string();
        }
        Ok(())
    }

    async fn get_passenger(&self, telegram_id: i64) -> AppResult<Option<Passenger>> {
        self.check_read()?;
        Ok(self.passengers.lock().get(&telegram_id).cloned())
    }

    async fn create_passenger(&self, passenger: &NewPassenger) -> AppResult<Passenger> {
        self.check_write()?;
        let created = Passenger {
            id: self.next_id(),
            telegram_id: passenger.telegram_id,
            full_name: passenger.full_name.clone(),
            phone: Some(passenger.phone.clone()),
            total_rides: 0,
        };
        self.passengers
            .lock()
            .insert(passenger.telegram_id, created.clone());
        Ok(created)
    }

    async fn create_travel(&self, travel: &NewTravel) -> AppResult<CreatedOrder> {
        self.check_write()?;
        let order_id = self.next_id();
        self.travels.lock().push(travel.clone());
        self.add_order(order_id, OrderStatus::Created);
        Ok(CreatedOrder { order_id })
    }

    async fn list_travels(&self, _telegram_id: i64) -> AppResult<Vec<Order>> {
        self.check_read()?;
        let mut orders = self.orders.lock().clone();
        orders.reverse();
        Ok(orders)
    }

    async fn create_post(&self, post: &NewPost) -> AppResult<CreatedOrder> {
        self.check_write()?;
        let order_id = self.next_id();
        self.posts.lock().push(post.clone());
        self.add_order(order_id, OrderStatus::Created);
        Ok(CreatedOrder { order_id })
    }

    async fn list_posts(&self, _telegram_id: i64) -> AppResult<Vec<Order>> {
        self.check_read()?;
        Ok(Vec::new())
    }

    async fn update_order_status(&self, order_id: i64, status: OrderStatus) -> AppResult<()> {
        self.check_write()?;
        if let Some(order) = self.orders.lock().iter_mut().find(|o| o.id == order_id) {
            order.status = status.clone();
        }
        self.status_updates.lock().push((order_id, status));
        Ok(())
    }

    async fn update_order_rate(&self, order_id: i64, rate: u8) -> AppResult<()> {
        self.check_write()?;
        self.rates.lock().push((order_id, rate));
        Ok(())
    }

    async fn list_orders(&self, _telegram_id: i64) -> AppResult<Vec<Order>> {
        self.check_read()?;
        Ok(self.orders.lock().clone())
    }

    async fn send_sms_code(&self, _telegram_id: i64, phone: &str) -> AppResult<SmsChallenge> {
        self.check_write()?;
        self.sms_requests.lock().push(phone.to_string());
        Ok(SmsChallenge {
            code: SMS_CODE.to_string(),
        })
    }
}

#[async_trait]
impl CityDirectory for FakeBackend {
    async fn list_cities(&self) -> AppResult<Vec<City>> {
        self.check_read()?;
        Ok(self.cities.lock().clone())
    }
}

#[async_trait]
impl Geocoder for FakeBackend {
    async fn reverse(&self, _point: GeoPoint) -> AppResult<Option<String>> {
        Ok(Some("Amir Temur street".to_string()))
    }

    async fn forward(&self, _place: &str, _language: &str) -> AppResult<Option<GeoPoint>> {
        Ok(None)
    }
}

/// Outbound action captured by [`RecordingOutbound`]
#[derive(Clone, Debug, PartialEq)]
pub enum Sent {
    Message {
        chat_id: i64,
        message_id: i32,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Edit {
        chat_id: i64,
        message_id: i32,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Delete {
        chat_id: i64,
        message_id: i32,
    },
    Answer {
        callback_id: String,
    },
}

impl Sent {
    /// Text of a sent or edited message
    pub fn text(&self) -> Option<&str> {
        match self {
            Sent::Message { text, .. } | Sent::Edit { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn keyboard(&self) -> Option<&Keyboard> {
        match self {
            Sent::Message { keyboard, .. } | Sent::Edit { keyboard, .. } => keyboard.as_ref(),
            _ => None,
        }
    }
}

#[derive(Default)]
pub struct RecordingOutbound {
    pub actions: Mutex<Vec<Sent>>,
    pub fail_sends: AtomicBool,
    next_message_id: AtomicI32,
}

impl RecordingOutbound {
    pub fn new() -> Self {
        let outbound = Self::default();
        outbound.next_message_id.store(100, Ordering::SeqCst);
        outbound
    }

    pub fn take(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.actions.lock())
    }

    /// Texts of every sent or edited message, in order
    pub fn texts(&self) -> Vec<String> {
        self.actions
            .lock()
            .iter()
            .filter_map(|a| a.text().map(str::to_string))
            .collect()
    }

    pub fn last_text(&self) -> Option<String> {
        self.texts().pop()
    }

    pub fn last_keyboard(&self) -> Option<Keyboard> {
        self.actions
            .lock()
            .iter()
            .rev()
            .find_map(|a| a.keyboard().cloned())
    }

    pub fn answered(&self) -> usize {
        self.actions
            .lock()
            .iter()
            .filter(|a| matches!(a, Sent::Answer { .. }))
            .count()
    }
}

#[async_trait]
impl ChatOutbound for RecordingOutbound {
    async fn send(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> AppResult<i32> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(AppError::Internal("Telegram sendMessage failed".to_string()));
        }
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        self.actions.lock().push(Sent::Message {
            chat_id,
            message_id,
            text: text.to_string(),
            keyboard,
        });
        Ok(message_id)
    }

    async fn edit(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> AppResult<()> {
        self.actions.lock().push(Sent::Edit {
            chat_id,
            message_id,
            text: text.to_string(),
            keyboard,
        });
        Ok(())
    }

    async fn delete(&self, chat_id: i64, message_id: i32) -> AppResult<()> {
        self.actions.lock().push(Sent::Delete {
            chat_id,
            message_id,
        });
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, _text: Option<&str>) -> AppResult<()> {
        self.actions.lock().push(Sent::Answer {
            callback_id: callback_id.to_string(),
        });
        Ok(())
    }
}

/// Dispatcher wired to fakes
pub struct Harness {
    pub dispatcher: Dispatcher,
    pub backend: Arc<FakeBackend>,
    pub outbound: Arc<RecordingOutbound>,
    pub state: Arc<InMemoryStateStore>,
    pub translator: Arc<Translator>,
}

/// Config with throttling disabled so flows can click quickly
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.bot.admin_ids = vec![ADMIN];
    config.dispatch.callback_rate_limit_ms = 0;
    config.localization = locales_config();
    config
}

impl Harness {
    pub fn new(backend: FakeBackend) -> Self {
        Self::with_config(backend, test_config())
    }

    pub fn with_config(backend: FakeBackend, config: AppConfig) -> Self {
        let registry = build_registry().expect("registry builds");
        Self::with_registry(backend, config, registry)
    }

    /// Dispatcher over a hand-built registry
    pub fn with_registry(backend: FakeBackend, config: AppConfig, registry: Registry) -> Self {
        let backend = Arc::new(backend);
        let outbound = Arc::new(RecordingOutbound::new());
        let state = Arc::new(InMemoryStateStore::new());
        let translator = translator();

        let services = Arc::new(Services {
            config,
            translator: Arc::clone(&translator),
            state: state.clone(),
            backend: backend.clone(),
            cities: backend.clone(),
            geocoder: backend.clone(),
            outbound: outbound.clone(),
            cache: CacheManager::new(),
            stats: Arc::new(DispatchStats::default()),
        });

        Self {
            dispatcher: Dispatcher::new(registry, services),
            backend,
            outbound,
            state,
            translator,
        }
    }

    pub async fn send(&self, event: InboundEvent) -> DispatchOutcome {
        self.dispatcher.dispatch(event).await
    }

    pub fn t(&self, key: &str, language: &str) -> String {
        self.translator.t(key, language)
    }

    pub async fn step(&self, user_id: i64) -> Option<ride_bot::dialogue::Step> {
        self.state.get_step(user_id).await.expect("state read")
    }
}

fn event(user_id: i64, message_id: Option<i32>, payload: EventPayload) -> InboundEvent {
    InboundEvent {
        user_id,
        chat_id: user_id,
        full_name: "Aziz Karimov".to_string(),
        username: Some("aziz".to_string()),
        language_code: Some("en".to_string()),
        message_id,
        payload,
    }
}

pub fn command(user_id: i64, name: &str) -> InboundEvent {
    event(
        user_id,
        Some(1),
        EventPayload::Command {
            name: name.to_string(),
            args: String::new(),
        },
    )
}

pub fn callback(user_id: i64, data: &str) -> InboundEvent {
    event(
        user_id,
        Some(42),
        EventPayload::Callback {
            id: format!("cb-{}", data),
            data: data.to_string(),
        },
    )
}

pub fn text(user_id: i64, body: &str) -> InboundEvent {
    event(user_id, Some(7), EventPayload::Text(body.to_string()))
}

pub fn contact(user_id: i64, phone: &str) -> InboundEvent {
    event(
        user_id,
        Some(8),
        EventPayload::Contact {
            phone: phone.to_string(),
        },
    )
}

pub fn location(user_id: i64, latitude: f64, longitude: f64) -> InboundEvent {
    event(
        user_id,
        Some(9),
        EventPayload::Location(GeoPoint::new(latitude, longitude)),
    )
}
