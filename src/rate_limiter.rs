//! # Per-user Rate Limiting
//!
//! Drops events that arrive within a minimum interval of the previously
//! accepted event for the same user. Telegram clients happily deliver three
//! callback queries for one impatient triple tap; only the first survives.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// When a user's last accepted event happened
#[derive(Debug, Clone)]
struct UserEntry {
    last_accepted: Instant,
}

/// In-memory per-user rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    users: Mutex<HashMap<i64, UserEntry>>,
    /// Entries idle longer than this are pruned
    retention: Duration,
    max_entries: usize,
}

impl RateLimiter {
    pub fn new(retention: Duration, max_entries: usize) -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            retention,
            max_entries,
        }
    }

    /// Returns true if an event that arrived at `now` is accepted and records it.
    ///
    /// Events are measured by arrival, not by when they got to run: a
    /// duplicate that queued behind a slow handler is still a duplicate.
    /// A rejected event does not move the window; the next event is measured
    /// from the last accepted one.
    pub fn check(&self, user_id: i64, window: Duration, now: Instant) -> bool {
        let mut users = self.users.lock();

        if users.len() >= self.max_entries {
            users.retain(|_, entry| {
                now.saturating_duration_since(entry.last_accepted) < self.retention
            });
            if users.len() >= self.max_entries {
                if let Some(oldest) = users
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_accepted)
                    .map(|(id, _)| *id)
                {
                    users.remove(&oldest);
                }
            }
        }

        match users.get_mut(&user_id) {
            Some(entry) if now.saturating_duration_since(entry.last_accepted) < window => false,
            Some(entry) => {
                entry.last_accepted = now;
                true
            }
            None => {
                users.insert(user_id, UserEntry { last_accepted: now });
                true
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(300), 10_000)
    }
}
