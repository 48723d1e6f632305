//! Contracts with the ride-matching backend.
//!
//! Handlers only see the traits below; [`client::BackendClient`] implements
//! all of them over HTTP, and tests substitute in-memory fakes.

pub mod client;
pub mod models;

use crate::errors::AppResult;
use crate::geo::GeoPoint;
use async_trait::async_trait;
use models::{
    BackendUser, City, CreatedOrder, NewPassenger, NewPost, NewTravel, NewUser, Order,
    OrderStatus, Passenger, SmsChallenge,
};
use std::sync::Arc;

pub use client::BackendClient;

/// Users, passengers, rides, posts and orders
#[async_trait]
pub trait RideBackend: Send + Sync {
    async fn get_user(&self, telegram_id: i64) -> AppResult<Option<BackendUser>>;

    async fn create_user(&self, user: &NewUser) -> AppResult<BackendUser>;

    async fn update_user_language(&self, telegram_id: i64, language: &str) -> AppResult<()>;

    async fn get_passenger(&self, telegram_id: i64) -> AppResult<Option<Passenger>>;

    async fn create_passenger(&self, passenger: &NewPassenger) -> AppResult<Passenger>;

    async fn create_travel(&self, travel: &NewTravel) -> AppResult<CreatedOrder>;

    /// Most recent first
    async fn list_travels(&self, telegram_id: i64) -> AppResult<Vec<Order>>;

    async fn create_post(&self, post: &NewPost) -> AppResult<CreatedOrder>;

    async fn list_posts(&self, telegram_id: i64) -> AppResult<Vec<Order>>;

    async fn update_order_status(&self, order_id: i64, status: OrderStatus) -> AppResult<()>;

    async fn update_order_rate(&self, order_id: i64, rate: u8) -> AppResult<()>;

    /// Every order of the user, rides and posts alike
    async fn list_orders(&self, telegram_id: i64) -> AppResult<Vec<Order>>;

    async fn send_sms_code(&self, telegram_id: i64, phone: &str) -> AppResult<SmsChallenge>;
}

/// City list with translations and selection flags
#[async_trait]
pub trait CityDirectory: Send + Sync {
    async fn list_cities(&self) -> AppResult<Vec<City>>;
}

/// Address lookup in both directions
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Human readable address of a point
    async fn reverse(&self, point: GeoPoint) -> AppResult<Option<String>>;

    /// Coordinates of a named place
    async fn forward(&self, place: &str, language: &str) -> AppResult<Option<GeoPoint>>;
}

pub type SharedRideBackend = Arc<dyn RideBackend>;
pub type SharedCityDirectory = Arc<dyn CityDirectory>;
pub type SharedGeocoder = Arc<dyn Geocoder>;
