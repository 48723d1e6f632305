//! Great-circle distance helpers used by location validation.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Distance to `other` in kilometres
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_km(*self, *other)
    }
}

/// Haversine great-circle distance in kilometres
///
/// ```text
/// a = sin²(Δφ/2) + cos φ1 · cos φ2 · sin²(Δλ/2)
/// c = 2 · atan2(√a, √(1−a))
/// d = R · c
/// ```
pub fn haversine_km(from: GeoPoint, to: GeoPoint) -> f64 {
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let delta_phi = (to.latitude - from.latitude).to_radians();
    let delta_lambda = (to.longitude - from.longitude).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Distance between two optional points; `None` when either is unknown
pub fn distance_between(from: Option<GeoPoint>, to: Option<GeoPoint>) -> Option<f64> {
    match (from, to) {
        (Some(a), Some(b)) => Some(haversine_km(a, b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero() {
        let tashkent = GeoPoint::new(41.3111, 69.2797);
        assert_eq!(haversine_km(tashkent, tashkent), 0.0);
    }

    #[test]
    fn test_one_degree_latitude() {
        let a = GeoPoint::new(41.0, 69.0);
        let b = GeoPoint::new(42.0, 69.0);
        let d = haversine_km(a, b);
        // 2πR/360 ≈ 111.19 km
        assert!((d - 111.19).abs() < 1.112, "distance was {}", d);
    }

    #[test]
    fn test_symmetric() {
        let tashkent = GeoPoint::new(41.3111, 69.2797);
        let kokand = GeoPoint::new(40.5286, 70.9425);
        let there = tashkent.distance_km(&kokand);
        let back = kokand.distance_km(&tashkent);
        assert!((there - back).abs() < 1e-9);
        assert!(there > 150.0 && there < 180.0);
    }

    #[test]
    fn test_missing_point() {
        assert_eq!(distance_between(None, Some(GeoPoint::new(1.0, 1.0))), None);
    }
}
