//! Request and response bodies of the backend REST API.

use crate::dialogue::{BookingDraft, LocationPoint, PostDraft};
use crate::geo::GeoPoint;
use crate::pricing::TravelClass;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

fn default_language() -> String {
    "en".to_string()
}

/// Telegram user record (`/clients`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendUser {
    pub telegram_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub is_banned: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub full_name: String,
    pub language: String,
}

/// Passenger profile, present once the phone number is verified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passenger {
    #[serde(default)]
    pub id: i64,
    pub telegram_id: i64,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub total_rides: u32,
}

impl Passenger {
    pub fn has_phone(&self) -> bool {
        self.phone.as_deref().is_some_and(|p| !p.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPassenger {
    pub telegram_id: i64,
    pub full_name: String,
    pub phone: String,
}

/// City directory entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    #[serde(default)]
    pub id: i64,
    /// Slug, e.g. `tashkent`
    pub title: String,
    /// Display name per language code
    #[serde(default)]
    pub translate: HashMap<String, String>,
    #[serde(default)]
    pub is_allowed: bool,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl City {
    /// Localized name, falling back to the slug
    pub fn name(&self, language: &str) -> &str {
        self.translate
            .get(language)
            .map(String::as_str)
            .unwrap_or(&self.title)
    }

    pub fn point(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        }
    }

    /// Allowed top-level cities appear in the selection keyboards
    pub fn is_selectable(&self) -> bool {
        self.is_allowed && self.subcategory.is_none()
    }
}

/// Paginated list wrapper used by list endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    #[serde(default)]
    pub results: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
}

/// Lifecycle status of an order
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Created,
    Assigned,
    Arrived,
    Started,
    Ended,
    Rejected,
    Other(String),
}

impl OrderStatus {
    /// Orders in these statuses block a new request
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            OrderStatus::Created | OrderStatus::Assigned | OrderStatus::Arrived | OrderStatus::Started
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Assigned => "assigned",
            OrderStatus::Arrived => "arrived",
            OrderStatus::Started => "started",
            OrderStatus::Ended => "ended",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Other(s) => s,
        }
    }
}

impl From<String> for OrderStatus {
    fn from(raw: String) -> Self {
        match raw.to_lowercase().as_str() {
            "created" => OrderStatus::Created,
            "assigned" => OrderStatus::Assigned,
            "arrived" => OrderStatus::Arrived,
            "started" => OrderStatus::Started,
            "ended" => OrderStatus::Ended,
            "rejected" => OrderStatus::Rejected,
            _ => OrderStatus::Other(raw),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Origin or destination as stored by the backend: either a structured
/// location or a bare city slug
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlaceRef {
    Detailed(LocationPoint),
    Name(String),
}

impl PlaceRef {
    pub fn city(&self) -> &str {
        match self {
            PlaceRef::Detailed(point) => &point.city,
            PlaceRef::Name(name) => name,
        }
    }
}

/// Order, travel or post record as returned by list endpoints
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Order {
    pub id: i64,
    pub status: OrderStatus,
    #[serde(default)]
    pub from_location: Option<PlaceRef>,
    #[serde(default)]
    pub to_location: Option<PlaceRef>,
    #[serde(default)]
    pub price: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Ride request submitted on confirmation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTravel {
    pub user: i64,
    pub from_location: LocationPoint,
    pub to_location: LocationPoint,
    pub travel_class: TravelClass,
    pub passenger: u8,
    pub has_woman: bool,
    pub price: u64,
}

impl NewTravel {
    pub fn from_draft(user: i64, draft: &BookingDraft) -> Self {
        Self {
            user,
            from_location: draft.from_location.clone(),
            to_location: draft.to_location.clone(),
            travel_class: draft.travel_class,
            passenger: draft.passenger,
            has_woman: draft.has_woman,
            price: draft.price,
        }
    }
}

/// Parcel post submitted on confirmation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPost {
    pub user: i64,
    pub from_location: LocationPoint,
    pub to_location: LocationPoint,
    pub price: u64,
}

impl NewPost {
    pub fn from_draft(user: i64, draft: &PostDraft) -> Self {
        Self {
            user,
            from_location: draft.from_location.clone(),
            to_location: draft.to_location.clone(),
            price: draft.price,
        }
    }
}

/// Response of create endpoints
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedOrder {
    #[serde(alias = "id")]
    pub order_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SmsRequest<'a> {
    pub telegram_id: i64,
    pub phone: &'a str,
    pub is_driver: bool,
}

/// Code the backend sent to the user's phone
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SmsChallenge {
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReverseGeocode {
    #[serde(default)]
    pub address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_status_parsing() {
        let order: Order = serde_json::from_value(json!({
            "id": 7,
            "status": "ASSIGNED",
            "from_location": {"city": "tashkent", "location": null},
            "to_location": "qoqon"
        }))
        .unwrap();

        assert_eq!(order.status, OrderStatus::Assigned);
        assert!(order.status.is_active());
        assert_eq!(order.from_location.unwrap().city(), "tashkent");
        assert_eq!(order.to_location.unwrap().city(), "qoqon");
    }

    #[test]
    fn test_terminal_statuses_are_inactive() {
        assert!(!OrderStatus::Ended.is_active());
        assert!(!OrderStatus::Rejected.is_active());
        assert!(!OrderStatus::from("archived".to_string()).is_active());
    }

    #[test]
    fn test_city_name_falls_back_to_slug() {
        let city: City = serde_json::from_value(json!({
            "title": "qoqon",
            "translate": {"ru": "Коканд"},
            "is_allowed": true
        }))
        .unwrap();

        assert_eq!(city.name("ru"), "Коканд");
        assert_eq!(city.name("uz"), "qoqon");
        assert!(city.is_selectable());
        assert_eq!(city.point(), None);
    }

    #[test]
    fn test_created_order_accepts_id_alias() {
        let created: CreatedOrder = serde_json::from_value(json!({"id": 12})).unwrap();
        assert_eq!(created.order_id, 12);
    }
}
