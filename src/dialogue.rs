//! Conversation state: the step a user is on and the data collected so far.

use crate::geo::GeoPoint;
use crate::pricing::{self, TravelClass};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Accumulated step data, keyed by the constants in [`keys`]
pub type StepData = serde_json::Map<String, Value>;

/// Keys used inside [`StepData`]
pub mod keys {
    pub const FROM_LOCATION: &str = "from_location";
    pub const TO_LOCATION: &str = "to_location";
    pub const TRAVEL_CLASS: &str = "travel_class";
    pub const PASSENGER: &str = "passenger";
    pub const HAS_WOMAN: &str = "has_woman";
    pub const PRICE: &str = "price";
    pub const SMS_CODE: &str = "sms_code";
    pub const PENDING_PHONE: &str = "pending_phone";
    /// Message holding the inline keyboard of the current step
    pub const PROMPT_MESSAGE_ID: &str = "prompt_message_id";
}

/// Which flow a step belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Ride,
    Post,
    Phone,
}

/// Position of a user inside a multi-step flow.
///
/// Ride and post steps live in separate namespaces so the two flows never
/// share a step for the same user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    #[serde(rename = "ride:from_location")]
    RideFromLocation,
    #[serde(rename = "ride:to_location")]
    RideToLocation,
    #[serde(rename = "ride:trip_details")]
    RideTripDetails,
    #[serde(rename = "post:from_location")]
    PostFromLocation,
    #[serde(rename = "post:to_location")]
    PostToLocation,
    #[serde(rename = "post:confirm")]
    PostConfirm,
    #[serde(rename = "phone:contact")]
    PhoneContact,
    #[serde(rename = "phone:sms_code")]
    SmsCode,
}

impl Step {
    pub const ALL: [Step; 8] = [
        Step::RideFromLocation,
        Step::RideToLocation,
        Step::RideTripDetails,
        Step::PostFromLocation,
        Step::PostToLocation,
        Step::PostConfirm,
        Step::PhoneContact,
        Step::SmsCode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::RideFromLocation => "ride:from_location",
            Step::RideToLocation => "ride:to_location",
            Step::RideTripDetails => "ride:trip_details",
            Step::PostFromLocation => "post:from_location",
            Step::PostToLocation => "post:to_location",
            Step::PostConfirm => "post:confirm",
            Step::PhoneContact => "phone:contact",
            Step::SmsCode => "phone:sms_code",
        }
    }

    pub fn flow(&self) -> Flow {
        match self {
            Step::RideFromLocation | Step::RideToLocation | Step::RideTripDetails => Flow::Ride,
            Step::PostFromLocation | Step::PostToLocation | Step::PostConfirm => Flow::Post,
            Step::PhoneContact | Step::SmsCode => Flow::Phone,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Step::ALL
            .iter()
            .copied()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| format!("unknown conversation step '{}'", s))
    }
}

/// Per-user conversation state
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub step: Option<Step>,
    #[serde(default)]
    pub data: StepData,
}

impl ConversationState {
    pub fn new(step: Step, data: StepData) -> Self {
        Self {
            step: Some(step),
            data,
        }
    }

    /// No active flow
    pub fn is_idle(&self) -> bool {
        self.step.is_none()
    }

    /// Typed read of one data key
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        read_key(&self.data, key)
    }
}

/// Typed read of one key; `None` when absent or of the wrong shape
pub fn read_key<T: DeserializeOwned>(data: &StepData, key: &str) -> Option<T> {
    data.get(key)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

/// Build a [`StepData`] from `(key, value)` pairs
pub fn step_data<I, V>(pairs: I) -> StepData
where
    I: IntoIterator<Item = (&'static str, V)>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.into()))
        .collect()
}

/// A validated origin or destination
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationPoint {
    /// City slug as used by the backend directory
    pub city: String,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl LocationPoint {
    pub fn city(city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            location: None,
            address: None,
        }
    }

    pub fn with_location(mut self, point: GeoPoint) -> Self {
        self.location = Some(point);
        self
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

pub const MIN_PASSENGERS: u8 = 1;
pub const MAX_PASSENGERS: u8 = 4;

/// Ride request being assembled on the trip details screen
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookingDraft {
    pub from_location: LocationPoint,
    pub to_location: LocationPoint,
    pub travel_class: TravelClass,
    pub passenger: u8,
    pub has_woman: bool,
    pub price: u64,
}

impl BookingDraft {
    /// Fresh draft with the defaults shown on first render
    pub fn new(from_location: LocationPoint, to_location: LocationPoint) -> Self {
        let mut draft = Self {
            from_location,
            to_location,
            travel_class: TravelClass::Standard,
            passenger: MIN_PASSENGERS,
            has_woman: false,
            price: 0,
        };
        draft.recompute_price();
        draft
    }

    pub fn recompute_price(&mut self) {
        self.price = pricing::ride_price(
            &self.from_location.city,
            &self.to_location.city,
            self.travel_class,
            self.passenger,
        );
    }

    /// Passenger count clamped to the allowed range
    pub fn set_passenger(&mut self, count: u8) {
        self.passenger = count.clamp(MIN_PASSENGERS, MAX_PASSENGERS);
        self.recompute_price();
    }

    pub fn set_has_woman(&mut self, has_woman: bool) {
        self.has_woman = has_woman;
    }

    pub fn set_travel_class(&mut self, class: TravelClass) {
        self.travel_class = class;
        self.recompute_price();
    }

    /// Read the draft out of step data
    pub fn from_data(data: &StepData) -> Option<Self> {
        let from_location = read_key(data, keys::FROM_LOCATION)?;
        let to_location = read_key(data, keys::TO_LOCATION)?;
        let mut draft = Self::new(from_location, to_location);
        if let Some(class) = read_key::<TravelClass>(data, keys::TRAVEL_CLASS) {
            draft.travel_class = class;
        }
        if let Some(passenger) = read_key::<u8>(data, keys::PASSENGER) {
            draft.passenger = passenger.clamp(MIN_PASSENGERS, MAX_PASSENGERS);
        }
        draft.has_woman = read_key(data, keys::HAS_WOMAN).unwrap_or(false);
        draft.recompute_price();
        Some(draft)
    }

    /// Full step data for the trip details step
    pub fn to_data(&self) -> StepData {
        let mut data = StepData::new();
        data.insert(keys::FROM_LOCATION.into(), self.from_location.to_value());
        data.insert(keys::TO_LOCATION.into(), self.to_location.to_value());
        data.insert(keys::TRAVEL_CLASS.into(), self.travel_class.as_str().into());
        data.insert(keys::PASSENGER.into(), self.passenger.into());
        data.insert(keys::HAS_WOMAN.into(), self.has_woman.into());
        data.insert(keys::PRICE.into(), self.price.into());
        data
    }
}

/// Parcel post waiting for confirmation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostDraft {
    pub from_location: LocationPoint,
    pub to_location: LocationPoint,
    pub price: u64,
}

impl PostDraft {
    pub fn new(from_location: LocationPoint, to_location: LocationPoint) -> Self {
        let price = pricing::post_price(&from_location.city, &to_location.city);
        Self {
            from_location,
            to_location,
            price,
        }
    }

    pub fn from_data(data: &StepData) -> Option<Self> {
        let from_location = read_key(data, keys::FROM_LOCATION)?;
        let to_location = read_key(data, keys::TO_LOCATION)?;
        Some(Self::new(from_location, to_location))
    }

    pub fn to_data(&self) -> StepData {
        let mut data = StepData::new();
        data.insert(keys::FROM_LOCATION.into(), self.from_location.to_value());
        data.insert(keys::TO_LOCATION.into(), self.to_location.to_value());
        data.insert(keys::PRICE.into(), self.price.into());
        data
    }
}
