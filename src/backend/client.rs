//! HTTP implementation of the backend contracts.
//!
//! One pooled `reqwest::Client` is created at startup and shared by every
//! handler. Reads are retried with exponential backoff and jitter; writes are
//! sent once. A circuit breaker short-circuits calls while the backend is
//! failing.

use super::models::{
    BackendUser, City, CreatedOrder, NewPassenger, NewPost, NewTravel, NewUser, Order,
    OrderStatus, Page, Passenger, ReverseGeocode, SmsChallenge, SmsRequest,
};
use super::{CityDirectory, Geocoder, RideBackend};
use crate::circuit_breaker::CircuitBreaker;
use crate::config::BackendConfig;
use crate::errors::{error_logging, AppError, AppResult};
use crate::geo::GeoPoint;
use crate::observability;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const BASE_RETRY_DELAY_MS: u64 = 200;
const MAX_RETRY_DELAY_MS: u64 = 2_000;
const MAX_CITY_PAGES: usize = 10;

/// Backend REST client
pub struct BackendClient {
    http: reqwest::Client,
    api_root: String,
    max_retries: u32,
    breaker: CircuitBreaker,
}

impl BackendClient {
    /// Build the shared client. Must be called once at startup.
    pub fn new(config: &BackendConfig) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &config.auth_token {
            let value = HeaderValue::from_str(&format!("Token {}", token))
                .map_err(|_| AppError::Config("Backend auth token is not a valid header".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_root: config.api_root(),
            max_retries: config.max_retries,
            breaker: CircuitBreaker::from_config(config),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_root, path)
    }

    /// Send one request; `Ok(None)` on 404, `Value::Null` for empty bodies
    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
    ) -> AppResult<Option<Value>> {
        let mut request = self.http.request(method.clone(), self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let bytes = response.bytes().await?;
        if !status.is_success() {
            let detail = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|v| {
                    ["detail", "error", "message"]
                        .iter()
                        .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_string))
                })
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(AppError::Backend(format!(
                "{} {} failed with {}: {}",
                method,
                path,
                status.as_u16(),
                detail
            )));
        }

        if bytes.is_empty() {
            return Ok(Some(Value::Null));
        }

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| AppError::Backend(format!("{} {} returned malformed JSON: {}", method, path, e)))
    }

    /// Circuit breaker, retries for reads, metrics and logging around `send_once`
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> AppResult<Option<Value>> {
        if self.breaker.is_open() {
            observability::update_circuit_breaker_state(true);
            return Err(AppError::Backend(
                "Backend temporarily unavailable after repeated failures".to_string(),
            ));
        }

        let start = Instant::now();
        let max_attempts = if method == Method::GET {
            self.max_retries + 1
        } else {
            1
        };
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.send_once(&method, path, body.as_ref()).await {
                Ok(value) => {
                    self.breaker.record_success();
                    observability::update_circuit_breaker_state(false);
                    observability::record_backend_request(path_label(path), "success", start.elapsed());
                    debug!(method = %method, path = %path, attempt = attempt, "Backend request succeeded");
                    return Ok(value);
                }
                Err(err) if attempt < max_attempts => {
                    let delay_ms = calculate_retry_delay(attempt);
                    warn!(
                        method = %method,
                        path = %path,
                        attempt = attempt,
                        error = %err,
                        "Backend request failed, retrying in {}ms",
                        delay_ms
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(err) => {
                    self.breaker.record_failure();
                    observability::update_circuit_breaker_state(self.breaker.is_open());
                    observability::record_backend_request(path_label(path), "failure", start.elapsed());
                    error_logging::log_backend_error(&err, method.as_str(), Some(path), Some(attempt));
                    return Err(err);
                }
            }
        }
    }

    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> AppResult<Option<T>> {
        match self.execute(Method::GET, path, None).await? {
            Some(Value::Null) | None => Ok(None),
            Some(value) => decode(path, value).map(Some),
        }
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> AppResult<Vec<T>> {
        match self.execute(Method::GET, path, None).await? {
            Some(value) => decode_list(path, value),
            None => Ok(Vec::new()),
        }
    }

    async fn write<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> AppResult<T> {
        let body = serde_json::to_value(body)?;
        let value = self
            .execute(method.clone(), path, Some(body))
            .await?
            .ok_or_else(|| AppError::Backend(format!("{} {} returned 404", method, path)))?;
        decode(path, value)
    }

    async fn patch(&self, path: &str, body: Value) -> AppResult<()> {
        self.execute(Method::PATCH, path, Some(body))
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::Backend(format!("PATCH {} returned 404", path)))
    }
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> AppResult<T> {
    serde_json::from_value(value)
        .map_err(|e| AppError::Backend(format!("Unexpected response from {}: {}", path, e)))
}

/// Accept both bare arrays and paginated `{"results": [...]}` bodies
fn decode_list<T: DeserializeOwned>(path: &str, value: Value) -> AppResult<Vec<T>> {
    match value {
        Value::Array(_) => decode(path, value),
        Value::Null => Ok(Vec::new()),
        other => decode::<Page<T>>(path, other).map(|page| page.results),
    }
}

/// Metric label without ids, e.g. `/orders/{id}/`
fn path_label(path: &str) -> &'static str {
    let path = path.split('?').next().unwrap_or(path);
    match path.split('/').nth(1).unwrap_or_default() {
        "clients" => "clients",
        "passengers" => "passengers",
        "travels" => "travels",
        "posts" => "posts",
        "orders" => "orders",
        "cities" => "cities",
        "sms" => "sms",
        _ => "other",
    }
}

/// Exponential backoff with up to 25% random jitter
///
/// ```text
/// delay  = min(base * 2^(attempt-1), max)
/// jitter = random(0, delay/4)
/// ```
pub fn calculate_retry_delay(attempt: u32) -> u64 {
    let exponential = BASE_RETRY_DELAY_MS.saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)));
    let delay = exponential.min(MAX_RETRY_DELAY_MS);
    let jitter_range = delay / 4;
    let jitter = if jitter_range > 0 {
        rand::random::<u64>() % jitter_range
    } else {
        0
    };
    delay + jitter
}

#[async_trait]
impl RideBackend for BackendClient {
    async fn get_user(&self, telegram_id: i64) -> AppResult<Option<BackendUser>> {
        self.get_optional(&format!("/clients/by-telegram-id/{}/", telegram_id))
            .await
    }

    async fn create_user(&self, user: &NewUser) -> AppResult<BackendUser> {
        self.write(Method::POST, "/clients/", user).await
    }

    async fn update_user_language(&self, telegram_id: i64, language: &str) -> AppResult<()> {
        self.patch(
            &format!("/clients/{}/", telegram_id),
            json!({ "language": language }),
        )
        .await
    }

    async fn get_passenger(&self, telegram_id: i64) -> AppResult<Option<Passenger>> {
        let passenger: Option<Passenger> = self
            .get_optional(&format!("/passengers/user/{}/", telegram_id))
            .await?;
        // the endpoint answers with an empty object for unknown users
        Ok(passenger.filter(|p| p.telegram_id == telegram_id))
    }

    async fn create_passenger(&self, passenger: &NewPassenger) -> AppResult<Passenger> {
        self.write(Method::POST, "/passengers/", passenger).await
    }

    async fn create_travel(&self, travel: &NewTravel) -> AppResult<CreatedOrder> {
        self.write(Method::POST, "/travels/", travel).await
    }

    async fn list_travels(&self, telegram_id: i64) -> AppResult<Vec<Order>> {
        self.get_list(&format!("/travels/user/{}/", telegram_id))
            .await
    }

    async fn create_post(&self, post: &NewPost) -> AppResult<CreatedOrder> {
        self.write(Method::POST, "/posts/", post).await
    }

    async fn list_posts(&self, telegram_id: i64) -> AppResult<Vec<Order>> {
        self.get_list(&format!("/posts/user/{}/", telegram_id)).await
    }

    async fn update_order_status(&self, order_id: i64, status: OrderStatus) -> AppResult<()> {
        self.patch(
            &format!("/orders/{}/", order_id),
            json!({ "status": status.as_str() }),
        )
        .await
    }

    async fn update_order_rate(&self, order_id: i64, rate: u8) -> AppResult<()> {
        self.patch(&format!("/orders/{}/", order_id), json!({ "rate": rate }))
            .await
    }

    async fn list_orders(&self, telegram_id: i64) -> AppResult<Vec<Order>> {
        self.get_list(&format!("/orders/user/{}/", telegram_id))
            .await
    }

    async fn send_sms_code(&self, telegram_id: i64, phone: &str) -> AppResult<SmsChallenge> {
        let request = SmsRequest {
            telegram_id,
            phone,
            is_driver: false,
        };
        self.write(Method::POST, "/sms/", &request).await
    }
}

#[async_trait]
impl CityDirectory for BackendClient {
    async fn list_cities(&self) -> AppResult<Vec<City>> {
        let mut cities = Vec::new();
        for page in 1..=MAX_CITY_PAGES {
            let path = format!("/cities/?page={}&page_size=100", page);
            let Some(value) = self.execute(Method::GET, &path, None).await? else {
                break;
            };
            if value.is_array() {
                cities.extend(decode::<Vec<City>>(&path, value)?);
                break;
            }
            let page: Page<City> = decode(&path, value)?;
            cities.extend(page.results);
            if page.next.is_none() {
                break;
            }
        }
        Ok(cities)
    }
}

#[async_trait]
impl Geocoder for BackendClient {
    async fn reverse(&self, point: GeoPoint) -> AppResult<Option<String>> {
        let body = json!({ "latitude": point.latitude, "longitude": point.longitude });
        let value = self
            .execute(Method::POST, "/cities/reverse-geocode/", Some(body))
            .await?;
        match value {
            Some(Value::Null) | None => Ok(None),
            Some(value) => Ok(decode::<ReverseGeocode>("/cities/reverse-geocode/", value)?.address),
        }
    }

    async fn forward(&self, place: &str, language: &str) -> AppResult<Option<GeoPoint>> {
        let path = format!(
            "/cities/geocode/?q={}&lang={}",
            urlencoding::encode(place),
            urlencoding::encode(language)
        );
        self.get_optional(&path).await
    }
}
