//! Validation module for user input
//!
//! A closed set of validators, selected by kind tag:
//!
//! - `location`: GPS point, typed city name or city button
//! - `text`: trimmed length bounds and an optional pattern
//! - `phone`: Uzbek numbering plan, normalized to `+998XXXXXXXXX`
//! - `number`: integer or float with optional bounds
//!
//! Every validator first checks whether typed text is a control label
//! (back, cancel, skip) and short-circuits to [`ValidationResult::Action`].
//! Errors carry translation keys, never rendered text.

use crate::backend::models::City;
use crate::backend::Geocoder;
use crate::dialogue::LocationPoint;
use crate::errors::AppResult;
use crate::geo::{self, GeoPoint};
use crate::localization::Translator;
use crate::slug_detection;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    static ref PHONE_NOISE: Regex = Regex::new(r"[\s\-\(\)]").expect("Invalid phone noise regex");
    static ref PHONE_PATTERNS: [Regex; 3] = [
        Regex::new(r"^\+998[0-9]{9}$").expect("Invalid phone regex"),
        Regex::new(r"^998[0-9]{9}$").expect("Invalid phone regex"),
        Regex::new(r"^[0-9]{9}$").expect("Invalid phone regex"),
    ];
}

/// Translation keys of validation failures
pub mod error_keys {
    pub const REQUIRED_FIELD: &str = "errors-required-field";
    pub const INVALID_INPUT: &str = "errors-invalid-input";
    pub const UNKNOWN_CITY: &str = "errors-unknown-city";
    pub const CITY_NOT_FOUND: &str = "errors-city-not-found";
    pub const SAME_CITY: &str = "errors-same-city";
    pub const SERVICE_NOT_AVAILABLE: &str = "errors-service-not-available";
    pub const TEXT_TOO_SHORT: &str = "errors-text-too-short";
    pub const TEXT_TOO_LONG: &str = "errors-text-too-long";
    pub const INVALID_FORMAT: &str = "errors-invalid-format";
    pub const INVALID_PHONE: &str = "errors-invalid-phone";
    pub const INVALID_NUMBER: &str = "errors-invalid-number";
    pub const NUMBER_TOO_SMALL: &str = "errors-number-too-small";
    pub const NUMBER_TOO_LARGE: &str = "errors-number-too-large";
}

/// Control labels a user may type instead of data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlAction {
    Back,
    Cancel,
    Skip,
}

impl ControlAction {
    pub const KEYS: [&'static str; 3] = ["btn-back", "btn-cancel", "btn-skip"];

    pub fn key(&self) -> &'static str {
        match self {
            ControlAction::Back => "btn-back",
            ControlAction::Cancel => "btn-cancel",
            ControlAction::Skip => "btn-skip",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "btn-back" => Some(ControlAction::Back),
            "btn-cancel" => Some(ControlAction::Cancel),
            "btn-skip" => Some(ControlAction::Skip),
            _ => None,
        }
    }
}

/// A rejected input: translation key plus its named arguments
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationError {
    pub key: &'static str,
    pub context: Vec<(&'static str, String)>,
}

impl ValidationError {
    pub fn new(key: &'static str) -> Self {
        Self {
            key,
            context: Vec::new(),
        }
    }

    pub fn with(mut self, name: &'static str, value: impl ToString) -> Self {
        self.context.push((name, value.to_string()));
        self
    }

    /// Render in the user's language
    pub fn message(&self, translator: &Translator, language: &str) -> String {
        let args: Vec<(&str, &str)> = self
            .context
            .iter()
            .map(|(name, value)| (*name, value.as_str()))
            .collect();
        translator.t_args(self.key, language, &args)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key)
    }
}

/// Outcome of one validation; consumed by the step handler, never stored
#[derive(Clone, Debug, PartialEq)]
pub enum ValidationResult<T> {
    Success(T),
    Error(ValidationError),
    Action(ControlAction),
}

impl<T> ValidationResult<T> {
    pub fn error(key: &'static str) -> Self {
        ValidationResult::Error(ValidationError::new(key))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ValidationResult<U> {
        match self {
            ValidationResult::Success(value) => ValidationResult::Success(f(value)),
            ValidationResult::Error(err) => ValidationResult::Error(err),
            ValidationResult::Action(action) => ValidationResult::Action(action),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ValidationResult::Success(_))
    }
}

/// Raw input handed to a validator
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ValidatorInput<'a> {
    Text(&'a str),
    Contact(&'a str),
    Location(GeoPoint),
    /// City slug from an inline button
    CityButton(&'a str),
}

impl ValidatorInput<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            ValidatorInput::Text(_) => "text",
            ValidatorInput::Contact(_) => "contact",
            ValidatorInput::Location(_) => "location",
            ValidatorInput::CityButton(_) => "city_button",
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            ValidatorInput::Text(text)
            | ValidatorInput::Contact(text)
            | ValidatorInput::CityButton(text) => text.trim().is_empty(),
            ValidatorInput::Location(_) => false,
        }
    }
}

/// Collaborators and flow data available while validating
pub struct ValidationContext<'a> {
    pub translator: &'a Translator,
    pub language: &'a str,
    /// Backend city directory
    pub cities: &'a [City],
    pub geocoder: Option<&'a dyn Geocoder>,
    /// Origin already chosen in the current flow
    pub previous: Option<&'a LocationPoint>,
}

impl<'a> ValidationContext<'a> {
    pub fn new(translator: &'a Translator, language: &'a str) -> Self {
        Self {
            translator,
            language,
            cities: &[],
            geocoder: None,
            previous: None,
        }
    }

    pub fn with_cities(mut self, cities: &'a [City]) -> Self {
        self.cities = cities;
        self
    }

    pub fn with_geocoder(mut self, geocoder: &'a dyn Geocoder) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn with_previous(mut self, previous: Option<&'a LocationPoint>) -> Self {
        self.previous = previous;
        self
    }
}

/// Typed text matching one of the control labels
pub fn detect_action(translator: &Translator, text: &str, language: &str) -> Option<ControlAction> {
    translator
        .detect_slug(text, language, &ControlAction::KEYS)
        .and_then(|m| ControlAction::from_key(&m.key))
}

/// Location validation settings
#[derive(Clone, Debug, PartialEq)]
pub struct LocationValidator {
    pub check_duplicate: bool,
    /// Points closer than this are the same city
    pub same_city_km: f64,
    /// GPS points farther than this from every allowed city are rejected
    pub service_radius_km: f64,
}

impl Default for LocationValidator {
    fn default() -> Self {
        Self {
            check_duplicate: true,
            same_city_km: 50.0,
            service_radius_km: 45.0,
        }
    }
}

impl LocationValidator {
    pub async fn validate(
        &self,
        input: &ValidatorInput<'_>,
        ctx: &ValidationContext<'_>,
    ) -> AppResult<ValidationResult<LocationPoint>> {
        let result = match *input {
            ValidatorInput::Location(point) => self.from_gps(point, ctx).await?,
            ValidatorInput::Text(text) => self.from_text(text, ctx).await?,
            ValidatorInput::CityButton(slug) => self.from_button(slug, ctx),
            ValidatorInput::Contact(_) => ValidationResult::error(error_keys::INVALID_INPUT),
        };

        Ok(match result {
            ValidationResult::Success(point) => self.check_duplicate(point, ctx),
            other => other,
        })
    }

    async fn from_gps(
        &self,
        point: GeoPoint,
        ctx: &ValidationContext<'_>,
    ) -> AppResult<ValidationResult<LocationPoint>> {
        let nearest = ctx
            .cities
            .iter()
            .filter(|c| c.is_selectable())
            .filter_map(|c| c.point().map(|p| (c, p.distance_km(&point))))
            .filter(|(_, distance)| *distance <= self.service_radius_km)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let Some((city, distance)) = nearest else {
            return Ok(ValidationResult::error(error_keys::SERVICE_NOT_AVAILABLE));
        };
        tracing::debug!(city = %city.title, distance_km = distance, "GPS point matched allowed city");

        let address = match ctx.geocoder {
            Some(geocoder) => geocoder.reverse(point).await?,
            None => None,
        };

        Ok(ValidationResult::Success(LocationPoint {
            city: city.title.clone(),
            location: Some(point),
            address,
        }))
    }

    async fn from_text(
        &self,
        text: &str,
        ctx: &ValidationContext<'_>,
    ) -> AppResult<ValidationResult<LocationPoint>> {
        let selectable: Vec<&City> = ctx.cities.iter().filter(|c| c.is_selectable()).collect();
        let candidates = selectable
            .iter()
            .flat_map(|c| [(c.name(ctx.language), c.title.as_str()), (c.title.as_str(), c.title.as_str())]);

        let Some(found) =
            slug_detection::detect_slug(text, candidates, ctx.translator.slug_threshold())
        else {
            return Ok(ValidationResult::error(error_keys::UNKNOWN_CITY));
        };
        let Some(city) = selectable.iter().find(|c| c.title == found.key) else {
            return Ok(ValidationResult::error(error_keys::UNKNOWN_CITY));
        };

        let coordinates = match (city.point(), ctx.geocoder) {
            (Some(point), _) => Some(point),
            (None, Some(geocoder)) => geocoder.forward(city.name(ctx.language), ctx.language).await?,
            (None, None) => None,
        };

        match coordinates {
            Some(point) => Ok(ValidationResult::Success(
                LocationPoint::city(city.title.clone()).with_location(point),
            )),
            None => Ok(ValidationResult::error(error_keys::CITY_NOT_FOUND)),
        }
    }

    fn from_button(&self, slug: &str, ctx: &ValidationContext<'_>) -> ValidationResult<LocationPoint> {
        match ctx
            .cities
            .iter()
            .find(|c| c.title == slug && c.is_selectable())
        {
            Some(city) => ValidationResult::Success(LocationPoint {
                city: city.title.clone(),
                location: city.point(),
                address: None,
            }),
            None => ValidationResult::error(error_keys::UNKNOWN_CITY),
        }
    }

    /// Reject a destination that is the origin again.
    ///
    /// With coordinates on both sides the distance decides; otherwise the
    /// city slugs are compared.
    fn check_duplicate(
        &self,
        point: LocationPoint,
        ctx: &ValidationContext<'_>,
    ) -> ValidationResult<LocationPoint> {
        if !self.check_duplicate {
            return ValidationResult::Success(point);
        }
        let Some(previous) = ctx.previous else {
            return ValidationResult::Success(point);
        };

        match geo::distance_between(previous.location, point.location) {
            Some(distance) if distance <= self.same_city_km => ValidationResult::Error(
                ValidationError::new(error_keys::SAME_CITY).with("distance", format!("{:.0}", distance)),
            ),
            Some(_) => ValidationResult::Success(point),
            None if previous.city.eq_ignore_ascii_case(&point.city) => {
                ValidationResult::error(error_keys::SAME_CITY)
            }
            None => ValidationResult::Success(point),
        }
    }
}

/// Free text bounds
#[derive(Clone, Debug, Default)]
pub struct TextValidator {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,
}

impl TextValidator {
    pub fn validate(&self, input: &ValidatorInput<'_>) -> ValidationResult<String> {
        let ValidatorInput::Text(raw) = input else {
            return ValidationResult::error(error_keys::INVALID_INPUT);
        };
        let text = raw.trim();
        let length = text.chars().count();

        if let Some(min) = self.min_length {
            if length < min {
                return ValidationResult::Error(
                    ValidationError::new(error_keys::TEXT_TOO_SHORT).with("min_length", min),
                );
            }
        }
        if let Some(max) = self.max_length {
            if length > max {
                return ValidationResult::Error(
                    ValidationError::new(error_keys::TEXT_TOO_LONG).with("max_length", max),
                );
            }
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(text) {
                return ValidationResult::error(error_keys::INVALID_FORMAT);
            }
        }

        ValidationResult::Success(text.to_string())
    }
}

/// Phone number from a shared contact or typed text
#[derive(Clone, Copy, Debug, Default)]
pub struct PhoneValidator;

impl PhoneValidator {
    pub fn validate(&self, input: &ValidatorInput<'_>) -> ValidationResult<String> {
        match input {
            ValidatorInput::Contact(raw) | ValidatorInput::Text(raw) => match normalize_phone(raw) {
                Some(phone) => ValidationResult::Success(phone),
                None => ValidationResult::error(error_keys::INVALID_PHONE),
            },
            _ => ValidationResult::error(error_keys::INVALID_PHONE),
        }
    }
}

/// Canonical `+998XXXXXXXXX` form, or `None` when the number is not local
///
/// # Examples
/// ```
/// use ride_bot::validation::normalize_phone;
///
/// assert_eq!(normalize_phone("+998 (90) 123-45-67").as_deref(), Some("+998901234567"));
/// assert_eq!(normalize_phone("901234567").as_deref(), Some("+998901234567"));
/// assert_eq!(normalize_phone("12345"), None);
/// ```
pub fn normalize_phone(raw: &str) -> Option<String> {
    let cleaned = PHONE_NOISE.replace_all(raw.trim(), "");
    if !PHONE_PATTERNS.iter().any(|p| p.is_match(&cleaned)) {
        return None;
    }

    Some(if cleaned.starts_with("+998") {
        cleaned.into_owned()
    } else if cleaned.starts_with("998") {
        format!("+{}", cleaned)
    } else {
        format!("+998{}", cleaned)
    })
}

/// Numeric input with optional bounds
#[derive(Clone, Debug, Default)]
pub struct NumberValidator {
    pub integer_only: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumberValidator {
    pub fn validate(&self, input: &ValidatorInput<'_>) -> ValidationResult<f64> {
        let ValidatorInput::Text(raw) = input else {
            return ValidationResult::error(error_keys::INVALID_NUMBER);
        };
        let raw = raw.trim();

        let parsed = if self.integer_only {
            raw.parse::<i64>().ok().map(|n| n as f64)
        } else {
            raw.parse::<f64>().ok().filter(|n| n.is_finite())
        };
        let Some(number) = parsed else {
            return ValidationResult::error(error_keys::INVALID_NUMBER);
        };

        if let Some(min) = self.min {
            if number < min {
                return ValidationResult::Error(
                    ValidationError::new(error_keys::NUMBER_TOO_SMALL).with("min_value", min),
                );
            }
        }
        if let Some(max) = self.max {
            if number > max {
                return ValidationResult::Error(
                    ValidationError::new(error_keys::NUMBER_TOO_LARGE).with("max_value", max),
                );
            }
        }

        ValidationResult::Success(number)
    }
}

/// Validated value of any kind
#[derive(Clone, Debug, PartialEq)]
pub enum Validated {
    Location(LocationPoint),
    Text(String),
    Phone(String),
    Number(f64),
}

/// The closed set of validators
#[derive(Clone, Debug)]
pub enum Validator {
    Location(LocationValidator),
    Text(TextValidator),
    Phone(PhoneValidator),
    Number(NumberValidator),
}

impl Validator {
    /// Default-configured validator for a kind tag
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "location" => Some(Validator::Location(LocationValidator::default())),
            "text" => Some(Validator::Text(TextValidator::default())),
            "phone" => Some(Validator::Phone(PhoneValidator)),
            "number" => Some(Validator::Number(NumberValidator::default())),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Validator::Location(_) => "location",
            Validator::Text(_) => "text",
            Validator::Phone(_) => "phone",
            Validator::Number(_) => "number",
        }
    }

    /// Run the control-label pre-check, then the kind specific validation.
    ///
    /// Collaborator failures (geocoding) are returned as `Err`; everything
    /// the user can fix is a [`ValidationResult::Error`].
    pub async fn validate(
        &self,
        input: &ValidatorInput<'_>,
        ctx: &ValidationContext<'_>,
    ) -> AppResult<ValidationResult<Validated>> {
        if let ValidatorInput::Text(text) = input {
            if let Some(action) = detect_action(ctx.translator, text, ctx.language) {
                return Ok(ValidationResult::Action(action));
            }
        }

        if input.is_blank() {
            return Ok(ValidationResult::error(error_keys::REQUIRED_FIELD));
        }

        Ok(match self {
            Validator::Location(v) => v.validate(input, ctx).await?.map(Validated::Location),
            Validator::Text(v) => v.validate(input).map(Validated::Text),
            Validator::Phone(v) => v.validate(input).map(Validated::Phone),
            Validator::Number(v) => v.validate(input).map(Validated::Number),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    const FTL: &str = "btn-back = ⬅️ Back\nbtn-cancel = Cancel\nbtn-skip = Skip\n";

    fn translator() -> Translator {
        Translator::from_sources("en", 0.8, [("en".to_string(), FTL.to_string())]).unwrap()
    }

    fn city(title: &str, en: &str, lat: Option<f64>, lng: Option<f64>) -> City {
        City {
            id: 0,
            title: title.to_string(),
            translate: HashMap::from([("en".to_string(), en.to_string())]),
            is_allowed: true,
            subcategory: None,
            latitude: lat,
            longitude: lng,
        }
    }

    fn cities() -> Vec<City> {
        vec![
            city("tashkent", "Tashkent", Some(41.3111), Some(69.2797)),
            city("qoqon", "Kokand", Some(40.5286), Some(70.9425)),
            city("namangan", "Namangan", None, None),
        ]
    }

    struct FixedGeocoder;

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn reverse(&self, _point: GeoPoint) -> AppResult<Option<String>> {
            Ok(Some("Amir Temur street".to_string()))
        }

        async fn forward(&self, place: &str, _language: &str) -> AppResult<Option<GeoPoint>> {
            Ok((place == "Namangan").then(|| GeoPoint::new(40.9983, 71.6726)))
        }
    }

    #[tokio::test]
    async fn test_control_label_short_circuits() {
        let translator = translator();
        let ctx = ValidationContext::new(&translator, "en");
        let validator = Validator::from_kind("phone").unwrap();

        let result = validator.validate(&ValidatorInput::Text("back"), &ctx).await.unwrap();
        assert_eq!(result, ValidationResult::Action(ControlAction::Back));

        let result = validator.validate(&ValidatorInput::Text("Cancel"), &ctx).await.unwrap();
        assert_eq!(result, ValidationResult::Action(ControlAction::Cancel));
    }

    #[tokio::test]
    async fn test_typed_city_resolves_with_coordinates() {
        let translator = translator();
        let cities = cities();
        let ctx = ValidationContext::new(&translator, "en").with_cities(&cities);

        let result = LocationValidator::default()
            .validate(&ValidatorInput::Text("tashkent"), &ctx)
            .await
            .unwrap();
        let ValidationResult::Success(point) = result else {
            panic!("expected success, got {:?}", result);
        };
        assert_eq!(point.city, "tashkent");
        assert!(point.location.is_some());
    }

    #[tokio::test]
    async fn test_unknown_city() {
        let translator = translator();
        let cities = cities();
        let ctx = ValidationContext::new(&translator, "en").with_cities(&cities);

        let result = LocationValidator::default()
            .validate(&ValidatorInput::Text("Samarkand"), &ctx)
            .await
            .unwrap();
        assert_eq!(result, ValidationResult::error(error_keys::UNKNOWN_CITY));
    }

    #[tokio::test]
    async fn test_city_without_coordinates_uses_forward_geocoding() {
        let translator = translator();
        let cities = cities();
        let geocoder = FixedGeocoder;

        let without = ValidationContext::new(&translator, "en").with_cities(&cities);
        let result = LocationValidator::default()
            .validate(&ValidatorInput::Text("Namangan"), &without)
            .await
            .unwrap();
        assert_eq!(result, ValidationResult::error(error_keys::CITY_NOT_FOUND));

        let with = ValidationContext::new(&translator, "en")
            .with_cities(&cities)
            .with_geocoder(&geocoder);
        let result = LocationValidator::default()
            .validate(&ValidatorInput::Text("Namangan"), &with)
            .await
            .unwrap();
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_same_city_is_rejected() {
        let translator = translator();
        let cities = cities();
        let origin = LocationPoint::city("tashkent").with_location(GeoPoint::new(41.30, 69.25));
        let ctx = ValidationContext::new(&translator, "en")
            .with_cities(&cities)
            .with_previous(Some(&origin));

        let result = LocationValidator::default()
            .validate(&ValidatorInput::CityButton("tashkent"), &ctx)
            .await
            .unwrap();
        let ValidationResult::Error(err) = result else {
            panic!("expected same city error");
        };
        assert_eq!(err.key, error_keys::SAME_CITY);

        let result = LocationValidator::default()
            .validate(&ValidatorInput::CityButton("qoqon"), &ctx)
            .await
            .unwrap();
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_same_slug_without_coordinates_is_rejected() {
        let translator = translator();
        let cities = cities();
        let origin = LocationPoint::city("namangan");
        let ctx = ValidationContext::new(&translator, "en")
            .with_cities(&cities)
            .with_previous(Some(&origin));

        let result = LocationValidator::default()
            .validate(&ValidatorInput::CityButton("namangan"), &ctx)
            .await
            .unwrap();
        assert_eq!(result, ValidationResult::error(error_keys::SAME_CITY));
    }

    #[tokio::test]
    async fn test_gps_outside_service_area() {
        let translator = translator();
        let cities = cities();
        let geocoder = FixedGeocoder;
        let ctx = ValidationContext::new(&translator, "en")
            .with_cities(&cities)
            .with_geocoder(&geocoder);

        // Samarkand, ~270 km from Tashkent
        let far = ValidatorInput::Location(GeoPoint::new(39.6542, 66.9597));
        let result = LocationValidator::default().validate(&far, &ctx).await.unwrap();
        assert_eq!(result, ValidationResult::error(error_keys::SERVICE_NOT_AVAILABLE));

        let near = ValidatorInput::Location(GeoPoint::new(41.35, 69.30));
        let result = LocationValidator::default().validate(&near, &ctx).await.unwrap();
        let ValidationResult::Success(point) = result else {
            panic!("expected success");
        };
        assert_eq!(point.city, "tashkent");
        assert_eq!(point.address.as_deref(), Some("Amir Temur street"));
    }

    #[test]
    fn test_phone_normalization() {
        let validator = PhoneValidator;
        assert_eq!(
            validator.validate(&ValidatorInput::Contact("998901234567")),
            ValidationResult::Success("+998901234567".to_string())
        );
        assert_eq!(
            validator.validate(&ValidatorInput::Text("90 123 45 67")),
            ValidationResult::Success("+998901234567".to_string())
        );
        assert_eq!(
            validator.validate(&ValidatorInput::Text("+7 900 123 45 67")),
            ValidationResult::error(error_keys::INVALID_PHONE)
        );
    }

    #[test]
    fn test_text_bounds_and_pattern() {
        let validator = TextValidator {
            min_length: Some(3),
            max_length: Some(5),
            pattern: Some(Regex::new(r"^[a-z]+$").unwrap()),
        };

        assert_eq!(
            validator.validate(&ValidatorInput::Text("  abcd ")),
            ValidationResult::Success("abcd".to_string())
        );
        let ValidationResult::Error(short) = validator.validate(&ValidatorInput::Text("ab")) else {
            panic!("expected error");
        };
        assert_eq!(short.key, error_keys::TEXT_TOO_SHORT);
        assert_eq!(short.context, vec![("min_length", "3".to_string())]);

        let ValidationResult::Error(long) = validator.validate(&ValidatorInput::Text("abcdef")) else {
            panic!("expected error");
        };
        assert_eq!(long.key, error_keys::TEXT_TOO_LONG);
        assert_eq!(
            validator.validate(&ValidatorInput::Text("AB12")),
            ValidationResult::error(error_keys::INVALID_FORMAT)
        );
    }

    #[test]
    fn test_number_bounds() {
        let validator = NumberValidator {
            integer_only: true,
            min: Some(1.0),
            max: Some(4.0),
        };

        assert_eq!(
            validator.validate(&ValidatorInput::Text("3")),
            ValidationResult::Success(3.0)
        );
        assert_eq!(
            validator.validate(&ValidatorInput::Text("2.5")),
            ValidationResult::error(error_keys::INVALID_NUMBER)
        );
        let ValidationResult::Error(small) = validator.validate(&ValidatorInput::Text("0")) else {
            panic!("expected error");
        };
        assert_eq!(small.key, error_keys::NUMBER_TOO_SMALL);
        let ValidationResult::Error(large) = validator.validate(&ValidatorInput::Text("9")) else {
            panic!("expected error");
        };
        assert_eq!(large.key, error_keys::NUMBER_TOO_LARGE);

        let floats = NumberValidator::default();
        assert_eq!(
            floats.validate(&ValidatorInput::Text("2.5")),
            ValidationResult::Success(2.5)
        );
    }

    #[tokio::test]
    async fn test_blank_input_is_required_field() {
        let translator = translator();
        let ctx = ValidationContext::new(&translator, "en");
        let validator = Validator::from_kind("text").unwrap();

        let result = validator.validate(&ValidatorInput::Text("   "), &ctx).await.unwrap();
        assert_eq!(result, ValidationResult::error(error_keys::REQUIRED_FIELD));
        assert!(Validator::from_kind("date").is_none());
    }

    #[test]
    fn test_error_renders_with_context() {
        let translator = Translator::from_sources(
            "en",
            0.8,
            [(
                "en".to_string(),
                "errors-text-too-short = At least { $min_length } characters\n".to_string(),
            )],
        )
        .unwrap();
        let err = ValidationError::new(error_keys::TEXT_TOO_SHORT).with("min_length", 3);
        assert_eq!(err.message(&translator, "en"), "At least 3 characters");
    }
}
