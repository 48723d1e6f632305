//! # Notification Relay
//!
//! Order lifecycle events pushed by the backend (`POST /notify`) are turned
//! into chat messages for the passenger:
//!
//! - `assigned`: driver found, with driver, car and trip details
//! - `arrived`: driver is waiting, with an "I'm in the car" button
//! - `ended`: rating prompt with five `rate:<n>:<id>` buttons
//!
//! Any other status is acknowledged and ignored.

use crate::bot::outbound::ChatOutbound;
use crate::bot::ui_builder::{in_car_keyboard, rate_keyboard};
use crate::errors::AppResult;
use crate::localization::Translator;
use crate::observability;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

/// Language used when the payload names none
pub const FALLBACK_LANGUAGE: &str = "uz";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Car {
    #[serde(default)]
    pub car_model: Option<String>,
    #[serde(default)]
    pub car_number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverDetails {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Number or string, depending on the backend version
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(default)]
    pub cars: Vec<Car>,
    #[serde(default)]
    pub from_location: Option<String>,
    #[serde(default)]
    pub to_location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentObject {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub passenger: Option<Value>,
    #[serde(default)]
    pub price: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Creator {
    #[serde(default)]
    pub language: Option<String>,
}

/// Webhook payload
#[derive(Debug, Clone, Deserialize)]
pub struct OrderNotification {
    pub status: String,
    #[serde(default)]
    pub id: i64,
    /// Chat id of the passenger
    pub user: i64,
    #[serde(default)]
    pub driver_details: Option<DriverDetails>,
    #[serde(default)]
    pub content_object: Option<ContentObject>,
    #[serde(default)]
    pub creator: Option<Creator>,
}

/// What the relay did with a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// Message sent for this status
    Sent(&'static str),
    Ignored,
}

fn display(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

fn or_dash(value: Option<&String>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| "-".to_string())
}

/// `qoqon` -> `Qoqon`, `new york` -> `New York`
fn title_case(raw: &str) -> String {
    raw.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl OrderNotification {
    /// Passenger language, falling back to [`FALLBACK_LANGUAGE`]
    pub fn language(&self, translator: &Translator) -> String {
        let requested = self
            .creator
            .as_ref()
            .and_then(|c| c.language.as_deref())
            .unwrap_or(FALLBACK_LANGUAGE);
        translator.resolve_language(Some(requested))
    }

    fn driver_found_text(&self, translator: &Translator, language: &str) -> String {
        let driver = self.driver_details.clone().unwrap_or_default();
        let car = driver.cars.first().cloned().unwrap_or_default();
        let content = self.content_object.clone().unwrap_or_default();

        let order_id = self.id.to_string();
        let full_name = or_dash(driver.full_name.as_ref());
        let car_model = or_dash(car.car_model.as_ref());
        let car_number = or_dash(car.car_number.as_ref());
        let phone = or_dash(driver.phone.as_ref());
        let rating = display(driver.rating.as_ref());
        let from_city = title_case(driver.from_location.as_deref().unwrap_or_default());
        let to_city = title_case(driver.to_location.as_deref().unwrap_or_default());
        let passenger = display(content.passenger.as_ref());
        let price = display(content.price.as_ref());

        translator.t_args(
            "find-driver",
            language,
            &[
                ("order_id", &order_id),
                ("full_name", &full_name),
                ("car_model", &car_model),
                ("car_number", &car_number),
                ("phone", &phone),
                ("rating", &rating),
                ("from_city", &from_city),
                ("to_city", &to_city),
                ("passenger", &passenger),
                ("price", &price),
            ],
        )
    }
}

/// Send the message matching the notification's status
pub async fn relay(
    notification: &OrderNotification,
    translator: &Translator,
    outbound: &dyn ChatOutbound,
) -> AppResult<NotificationOutcome> {
    let language = notification.language(translator);
    let chat_id = notification.user;

    let outcome = match notification.status.to_lowercase().as_str() {
        "assigned" => {
            let text = notification.driver_found_text(translator, &language);
            outbound.send(chat_id, &text, None).await?;
            NotificationOutcome::Sent("assigned")
        }
        "arrived" => {
            outbound
                .send(
                    chat_id,
                    &translator.t("driver-arrived", &language),
                    Some(in_car_keyboard(translator, &language, notification.id)),
                )
                .await?;
            NotificationOutcome::Sent("arrived")
        }
        "ended" => {
            outbound
                .send(
                    chat_id,
                    &translator.t("rate-trip", &language),
                    Some(rate_keyboard(notification.id)),
                )
                .await?;
            NotificationOutcome::Sent("ended")
        }
        other => {
            debug!(status = %other, order_id = %notification.id, "Ignoring notification status");
            NotificationOutcome::Ignored
        }
    };

    match outcome {
        NotificationOutcome::Sent(status) => {
            observability::record_notification(status);
            info!(status = %status, order_id = %notification.id, user = %chat_id, "Notification relayed");
        }
        NotificationOutcome::Ignored => observability::record_notification("ignored"),
    }

    Ok(outcome)
}
