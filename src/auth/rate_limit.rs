//! Limits how often a client may try to log in as a given user.

use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

/// The length of a rate limiting window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
/// The number of attempts allowed per key in one window.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// The number of keys tracked before old entries are evicted.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Decides whether another attempt for a key is allowed.
///
/// Implementations must be safe to share between request handlers.
pub trait RateLimiter: Send + Sync + Debug {
    /// Record an attempt for `key` at `now` and return whether it is allowed.
    fn check(&self, key: &str, now: Instant) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    count: u32,
    reset_at: Instant,
}

/// A fixed window rate limiter that keeps at most `capacity` keys in memory.
#[derive(Debug)]
pub struct WindowedRateLimiter {
    window: Duration,
    max_attempts: u32,
    capacity: usize,
    entries: Mutex<HashMap<String, Entry>>,
}

impl WindowedRateLimiter {
    /// Create a rate limiter that allows `max_attempts` per key every `window`.
    pub fn new(window: Duration, max_attempts: u32, capacity: usize) -> Self {
        Self {
            window,
            max_attempts,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn make_room(&self, entries: &mut HashMap<String, Entry>, now: Instant) {
        entries.retain(|_, entry| entry.reset_at > now);

        if entries.len() < self.capacity {
            return;
        }

        let oldest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.reset_at)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            tracing::debug!("rate limiter full, evicting {key}");
            entries.remove(&key);
        }
    }
}

impl Default for WindowedRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_MAX_ATTEMPTS, DEFAULT_CAPACITY)
    }
}

impl RateLimiter for WindowedRateLimiter {
    fn check(&self, key: &str, now: Instant) -> bool {
        // The map holds plain counters, a panic mid-update cannot leave it inconsistent.
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(entry) = entries.get_mut(key).filter(|entry| entry.reset_at > now) {
            if entry.count >= self.max_attempts {
                return false;
            }

            entry.count += 1;
            return true;
        }

        if !entries.contains_key(key) && entries.len() >= self.capacity {
            self.make_room(&mut entries, now);
        }

        entries.insert(
            key.to_owned(),
            Entry {
                count: 1,
                reset_at: now + self.window,
            },
        );

        true
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::{RateLimiter, WindowedRateLimiter};

    #[test]
    fn allows_five_attempts_then_rejects() {
        let limiter = WindowedRateLimiter::default();
        let now = Instant::now();

        for attempt in 1..=5 {
            assert!(limiter.check("1.2.3.4-owner", now), "attempt {attempt}");
        }

        assert!(!limiter.check("1.2.3.4-owner", now));
        assert!(!limiter.check("1.2.3.4-owner", now + Duration::from_secs(59)));
    }

    #[test]
    fn window_resets_after_sixty_seconds() {
        let limiter = WindowedRateLimiter::default();
        let now = Instant::now();
        for _ in 0..6 {
            limiter.check("key", now);
        }

        assert!(limiter.check("key", now + Duration::from_secs(60)));
    }

    #[test]
    fn keys_are_limited_independently() {
        let limiter = WindowedRateLimiter::default();
        let now = Instant::now();
        for _ in 0..5 {
            limiter.check("1.2.3.4-owner", now);
        }

        assert!(!limiter.check("1.2.3.4-owner", now));
        assert!(limiter.check("1.2.3.4-partner", now));
        assert!(limiter.check("5.6.7.8-owner", now));
    }

    #[test]
    fn rejected_attempts_do_not_extend_the_window() {
        let limiter = WindowedRateLimiter::new(Duration::from_secs(60), 1, 16);
        let now = Instant::now();

        assert!(limiter.check("key", now));
        assert!(!limiter.check("key", now + Duration::from_secs(30)));
        assert!(limiter.check("key", now + Duration::from_secs(60)));
    }

    #[test]
    fn evicts_earliest_reset_when_full() {
        let limiter = WindowedRateLimiter::new(Duration::from_secs(60), 1, 2);
        let now = Instant::now();

        assert!(limiter.check("a", now));
        assert!(limiter.check("b", now + Duration::from_secs(1)));
        assert!(limiter.check("c", now + Duration::from_secs(2)));

        // "a" was evicted so it starts a new window, "c" is still tracked.
        assert!(limiter.check("a", now + Duration::from_secs(3)));
        assert!(!limiter.check("c", now + Duration::from_secs(3)));
    }

    #[test]
    fn purges_expired_entries_before_evicting() {
        let limiter = WindowedRateLimiter::new(Duration::from_secs(10), 1, 2);
        let now = Instant::now();
        limiter.check("a", now);
        limiter.check("b", now + Duration::from_secs(5));

        assert!(limiter.check("c", now + Duration::from_secs(11)));

        assert!(!limiter.check("b", now + Duration::from_secs(12)));
    }
}
