//! Static fare table for rides and parcel posts.
//!
//! Every fare is defined against the hub city. A trip between two non-hub
//! cities costs the average of both hub fares, and anything the table does
//! not know falls back to [`DEFAULT_FARE`]. All functions are pure.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// City every fare in the table is quoted against
pub const HUB_CITY: &str = "tashkent";

/// Fare used when the pair is not in the table
pub const DEFAULT_FARE: u64 = 150_000;

/// Ride comfort tier chosen on the trip details screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TravelClass {
    Economy,
    #[default]
    Standard,
    Business,
}

impl TravelClass {
    pub const ALL: [TravelClass; 3] = [
        TravelClass::Economy,
        TravelClass::Standard,
        TravelClass::Business,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TravelClass::Economy => "economy",
            TravelClass::Standard => "standard",
            TravelClass::Business => "business",
        }
    }
}

impl fmt::Display for TravelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelClass {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "economy" => Ok(TravelClass::Economy),
            "standard" => Ok(TravelClass::Standard),
            // older clients still send the comfort tier name
            "business" | "comfort" => Ok(TravelClass::Business),
            _ => Err("unknown_travel_class"),
        }
    }
}

struct HubFare {
    city: &'static str,
    economy: u64,
    standard: u64,
    business: u64,
}

const HUB_FARES: &[HubFare] = &[
    HubFare {
        city: "qoqon",
        economy: 130_000,
        standard: 200_000,
        business: 230_000,
    },
    HubFare {
        city: "fargona",
        economy: 180_000,
        standard: 250_000,
        business: 270_000,
    },
    HubFare {
        city: "namangan",
        economy: 170_000,
        standard: 240_000,
        business: 260_000,
    },
    HubFare {
        city: "andijan",
        economy: 200_000,
        standard: 270_000,
        business: 290_000,
    },
];

fn normalize(city: &str) -> String {
    let city = city.trim().to_lowercase();
    match city.as_str() {
        "andijon" => "andijan".to_string(),
        "kokand" | "quqon" => "qoqon".to_string(),
        "fergana" | "farg'ona" => "fargona".to_string(),
        "toshkent" => HUB_CITY.to_string(),
        _ => city,
    }
}

fn hub_fare(city: &str, class: TravelClass) -> Option<u64> {
    HUB_FARES.iter().find(|f| f.city == city).map(|f| match class {
        TravelClass::Economy => f.economy,
        TravelClass::Standard => f.standard,
        TravelClass::Business => f.business,
    })
}

/// Base fare for one passenger between two cities
pub fn base_fare(from_city: &str, to_city: &str, class: TravelClass) -> u64 {
    let from = normalize(from_city);
    let to = normalize(to_city);

    if from == HUB_CITY {
        return hub_fare(&to, class).unwrap_or(DEFAULT_FARE);
    }
    if to == HUB_CITY {
        return hub_fare(&from, class).unwrap_or(DEFAULT_FARE);
    }

    match (hub_fare(&from, class), hub_fare(&to, class)) {
        (Some(a), Some(b)) => (a + b) / 2,
        _ => DEFAULT_FARE,
    }
}

/// Total ride price: base fare times passenger count
pub fn ride_price(from_city: &str, to_city: &str, class: TravelClass, passengers: u8) -> u64 {
    base_fare(from_city, to_city, class) * u64::from(passengers)
}

/// Parcel delivery fee: half of the economy fare
pub fn post_price(from_city: &str, to_city: &str) -> u64 {
    base_fare(from_city, to_city, TravelClass::Economy) / 2
}

/// Format an amount with space separated thousands, e.g. `200 000`
pub fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_fares() {
        assert_eq!(ride_price("tashkent", "qoqon", TravelClass::Standard, 1), 200_000);
        assert_eq!(ride_price("tashkent", "qoqon", TravelClass::Standard, 2), 400_000);
        assert_eq!(ride_price("qoqon", "tashkent", TravelClass::Economy, 1), 130_000);
        assert_eq!(base_fare("tashkent", "andijon", TravelClass::Business), 290_000);
    }

    #[test]
    fn test_non_hub_pair_averages() {
        // (180 000 + 170 000) / 2
        assert_eq!(base_fare("fargona", "namangan", TravelClass::Economy), 175_000);
        assert_eq!(
            base_fare("fargona", "namangan", TravelClass::Economy),
            base_fare("namangan", "fargona", TravelClass::Economy)
        );
    }

    #[test]
    fn test_unknown_pair_uses_default() {
        assert_eq!(base_fare("samarkand", "bukhara", TravelClass::Standard), DEFAULT_FARE);
        assert_eq!(base_fare("tashkent", "samarkand", TravelClass::Economy), DEFAULT_FARE);
    }

    #[test]
    fn test_pricing_is_deterministic() {
        let first = ride_price("tashkent", "fargona", TravelClass::Business, 3);
        let second = ride_price("tashkent", "fargona", TravelClass::Business, 3);
        assert_eq!(first, second);
        assert_eq!(first, 810_000);
    }

    #[test]
    fn test_post_price_is_half_economy() {
        assert_eq!(post_price("tashkent", "qoqon"), 65_000);
        assert_eq!(post_price("samarkand", "bukhara"), 75_000);
    }

    #[test]
    fn test_travel_class_parsing() {
        assert_eq!("comfort".parse::<TravelClass>(), Ok(TravelClass::Business));
        assert_eq!("Economy".parse::<TravelClass>(), Ok(TravelClass::Economy));
        assert!("luxury".parse::<TravelClass>().is_err());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(200_000), "200 000");
        assert_eq!(format_amount(1_250_000), "1 250 000");
        assert_eq!(format_amount(950), "950");
    }
}
