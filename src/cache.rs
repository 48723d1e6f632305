//! Caching for backend lookups that are read on nearly every update
//!
//! - **Memory Cache**: In-memory TTL-based cache shared across tasks
//! - **Cache Manager**: the user language cache and the city directory cache
//!
//! Expired entries are dropped when they are read and by the periodic
//! [`CacheManager::cleanup_all`] sweep started in `main`.
//!
//! ```rust
//! use ride_bot::cache::MemoryCache;
//! use std::time::Duration;
//!
//! let cache: MemoryCache<i64, String> = MemoryCache::new();
//! cache.insert(42, "uz".to_string(), Duration::from_secs(300));
//! assert_eq!(cache.get(&42), Some("uz".to_string()));
//! ```

use crate::backend::models::City;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Thread-safe in-memory cache with per-entry TTL
#[derive(Debug)]
pub struct MemoryCache<K, V> {
    data: RwLock<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> MemoryCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Live value for `key`; an expired entry is removed on the way out
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        {
            let data = self.data.read();
            match data.get(key) {
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        let mut data = self.data.write();
        // another task may have refreshed it between the two locks
        match data.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(_) => {
                data.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.data.write().insert(key, entry);
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.data.write().remove(key).map(|entry| entry.value)
    }

    /// Drop every expired entry, returning how many went
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut data = self.data.write();
        let initial_len = data.len();
        data.retain(|_, entry| !entry.is_expired(now));
        initial_len - data.len()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl<K, V> Default for MemoryCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Caches shared by the handlers
#[derive(Debug)]
pub struct CacheManager {
    /// Preferred language per Telegram user id
    pub user_languages: MemoryCache<i64, String>,
    /// The whole city directory, stored under a single key
    pub cities: MemoryCache<(), Arc<Vec<City>>>,
    user_ttl: Duration,
    city_ttl: Duration,
}

impl CacheManager {
    /// Create a cache manager with default settings
    pub fn new() -> Self {
        Self::with_config(Duration::from_secs(600), Duration::from_secs(300))
    }

    /// Create a cache manager with custom settings
    pub fn with_config(user_ttl: Duration, city_ttl: Duration) -> Self {
        Self {
            user_languages: MemoryCache::new(),
            cities: MemoryCache::new(),
            user_ttl,
            city_ttl,
        }
    }

    pub fn language(&self, user_id: i64) -> Option<String> {
        self.user_languages.get(&user_id)
    }

    pub fn store_language(&self, user_id: i64, language: &str) {
        self.user_languages
            .insert(user_id, language.to_string(), self.user_ttl);
    }

    /// Drop the cached language after the user changes it
    pub fn invalidate_language(&self, user_id: i64) {
        self.user_languages.remove(&user_id);
    }

    pub fn city_list(&self) -> Option<Arc<Vec<City>>> {
        self.cities.get(&())
    }

    pub fn store_city_list(&self, cities: Vec<City>) -> Arc<Vec<City>> {
        let cities = Arc::new(cities);
        self.cities.insert((), Arc::clone(&cities), self.city_ttl);
        cities
    }

    /// Clean up expired entries in all caches
    pub fn cleanup_all(&self) {
        let removed = self.user_languages.cleanup() + self.cities.cleanup();
        if removed > 0 {
            tracing::debug!("Cache cleanup removed {} expired entries", removed);
        }
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cache_basic_operations() {
        let cache: MemoryCache<String, String> = MemoryCache::new();

        cache.insert("key1".to_string(), "value1".to_string(), Duration::from_secs(60));
        assert_eq!(cache.get(&"key1".to_string()), Some("value1".to_string()));
        assert_eq!(cache.get(&"missing".to_string()), None);

        assert_eq!(cache.remove(&"key1".to_string()), Some("value1".to_string()));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_entry_is_removed_on_read() {
        let cache: MemoryCache<i64, String> = MemoryCache::new();
        cache.insert(1, "en".to_string(), Duration::ZERO);
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.get(&1), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cleanup_keeps_live_entries() {
        let cache: MemoryCache<i64, String> = MemoryCache::new();
        cache.insert(1, "en".to_string(), Duration::ZERO);
        cache.insert(2, "ru".to_string(), Duration::ZERO);
        cache.insert(3, "uz".to_string(), Duration::from_secs(60));

        assert_eq!(cache.cleanup(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&3), Some("uz".to_string()));
    }

    #[test]
    fn test_cleanup_all_sweeps_user_languages() {
        let manager = CacheManager::with_config(Duration::ZERO, Duration::from_secs(60));
        for user_id in 0..50 {
            manager.store_language(user_id, "ru");
        }
        manager.store_city_list(Vec::new());

        manager.cleanup_all();

        assert!(manager.user_languages.is_empty());
        assert!(manager.city_list().is_some());
    }

    #[test]
    fn test_language_invalidation() {
        let manager = CacheManager::new();
        manager.store_language(7, "ru");
        assert_eq!(manager.language(7), Some("ru".to_string()));

        manager.invalidate_language(7);
        assert_eq!(manager.language(7), None);
    }
}
