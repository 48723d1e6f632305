//! # Circuit Breaker Module
//!
//! Circuit breaker in front of the backend REST API. When the backend keeps
//! failing, requests are short-circuited for a while instead of piling up
//! behind the HTTP timeout for every user.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

use crate::config::BackendConfig;

/// Circuit breaker for backend requests
///
/// ```text
/// CLOSED ────failures ≥ threshold────► OPEN
///    ▲                                      │
///    │                                      │
///    └─────────reset timeout───────────────┘
///                    │
///                    ▼
///                 HALF-OPEN ───success───► CLOSED
///                    │
///                    └────failure───────► OPEN
/// ```
///
/// - **CLOSED → OPEN**: when the failure count reaches the threshold
/// - **OPEN → HALF-OPEN**: after the reset timeout elapses
/// - **HALF-OPEN → CLOSED**: on the first successful request
/// - **HALF-OPEN → OPEN**: on another failure
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    threshold: u32,
    reset_after: Duration,
}

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker
    ///
    /// ```rust
    /// use ride_bot::circuit_breaker::CircuitBreaker;
    /// use std::time::Duration;
    ///
    /// let breaker = CircuitBreaker::new(5, Duration::from_secs(60));
    /// assert!(!breaker.is_open());
    /// ```
    pub fn new(threshold: u32, reset_after: Duration) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            threshold,
            reset_after,
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(
            config.circuit_breaker_threshold,
            Duration::from_secs(config.circuit_breaker_reset_secs),
        )
    }

    /// Check if circuit breaker is open (blocking requests)
    ///
    /// Once the reset timeout has elapsed the counters are cleared so the next
    /// request can probe the backend.
    pub fn is_open(&self) -> bool {
        let mut state = self.state.lock();

        if state.failure_count >= self.threshold {
            if let Some(last_time) = state.last_failure_time {
                if last_time.elapsed() < self.reset_after {
                    return true;
                }
                *state = BreakerState::default();
            }
        }
        false
    }

    /// Record a failed backend request
    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        state.failure_count += 1;
        state.last_failure_time = Some(Instant::now());
    }

    /// Record a successful backend request
    pub fn record_success(&self) {
        *self.state.lock() = BreakerState::default();
    }

    pub fn failure_count(&self) -> u32 {
        self.state.lock().failure_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opens_after_threshold() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));

        breaker.record_failure();
        breaker.record_failure();
        assert!(!breaker.is_open());

        breaker.record_failure();
        assert!(breaker.is_open());
    }

    #[test]
    fn test_success_closes_circuit() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(60));
        breaker.record_failure();
        assert!(breaker.is_open());

        breaker.record_success();
        assert!(!breaker.is_open());
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn test_resets_after_timeout() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        breaker.record_failure();
        assert!(breaker.is_open());

        std::thread::sleep(Duration::from_millis(20));
        assert!(!breaker.is_open());
        assert_eq!(breaker.failure_count(), 0);
    }
}
