use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::debug;

pub const DEFAULT_MAX_REQUESTS: u32 = 10;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Expired windows are swept once the map holds this many keys
const PRUNE_THRESHOLD: usize = 10_000;

/// Admission check keyed by client identity
pub trait RateLimiter: Send + Sync {
    /// Count one request for `key`; `false` means reject
    fn check_and_increment(&self, key: &str) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

/// Fixed-window counter held in process memory
#[derive(Debug)]
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    entries: Mutex<Entries>,
}

#[derive(Debug, Default)]
struct Entries {
    windows: HashMap<String, Window>,
    last_prune: Option<Instant>,
}

impl Default for FixedWindowLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            entries: Mutex::default(),
        }
    }

    pub fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        // at most one sweep per window
        let swept_recently = entries
            .last_prune
            .is_some_and(|t| now.saturating_duration_since(t) < self.window);
        if entries.windows.len() >= PRUNE_THRESHOLD && !swept_recently && !entries.windows.contains_key(key) {
            let before = entries.windows.len();
            entries
                .windows
                .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
            entries.last_prune = Some(now);
            debug!("Pruned {} expired rate-limit windows", before - entries.windows.len());
        }

        if let Some(w) = entries.windows.get_mut(key)
            && now.saturating_duration_since(w.started) < self.window
        {
            if w.count >= self.max_requests {
                return false;
            }
            w.count += 1;
            return true;
        }

        entries.windows.insert(
            key.to_string(),
            Window {
                count: 1,
                started: now,
            },
        );
        true
    }

    #[cfg(test)]
    fn count(&self, key: &str) -> Option<u32> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.windows.get(key).map(|w| w.count)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).windows.len()
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn check_and_increment(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }
}

/// Never rejects
#[derive(Debug, Default)]
pub struct Unlimited;

impl RateLimiter for Unlimited {
    fn check_and_increment(&self, _key: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eleventh_request_in_window_rejected() {
        let limiter = FixedWindowLimiter::default();
        let t0 = Instant::now();
        for i in 0..10 {
            assert!(limiter.check_at("1.2.3.4", t0 + Duration::from_secs(i)), "request {i}");
        }
        assert!(!limiter.check_at("1.2.3.4", t0 + Duration::from_secs(30)));
        assert_eq!(limiter.count("1.2.3.4"), Some(10));
    }

    #[test]
    fn test_window_expiry_resets_count() {
        let limiter = FixedWindowLimiter::default();
        let t0 = Instant::now();
        for _ in 0..11 {
            limiter.check_at("ip", t0);
        }
        assert!(limiter.check_at("ip", t0 + Duration::from_secs(61)));
        assert_eq!(limiter.count("ip"), Some(1));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = FixedWindowLimiter::new(1, DEFAULT_WINDOW);
        let t0 = Instant::now();
        assert!(limiter.check_at("a", t0));
        assert!(!limiter.check_at("a", t0));
        assert!(limiter.check_at("b", t0));
    }

    #[test]
    fn test_expired_keys_are_pruned() {
        let limiter = FixedWindowLimiter::new(10, Duration::from_secs(1));
        let t0 = Instant::now();
        for i in 0..PRUNE_THRESHOLD {
            limiter.check_at(&format!("10.0.{}.{}", i / 256, i % 256), t0);
        }
        assert_eq!(limiter.len(), PRUNE_THRESHOLD);

        assert!(limiter.check_at("fresh", t0 + Duration::from_secs(5)));
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_prune_runs_once_per_window() {
        let limiter = FixedWindowLimiter::new(10, Duration::from_secs(10));
        let t0 = Instant::now();
        for i in 0..PRUNE_THRESHOLD {
            limiter.check_at(&format!("10.0.{}.{}", i / 256, i % 256), t0);
        }

        // nothing has expired yet, so this sweep removes nothing
        assert!(limiter.check_at("a", t0 + Duration::from_secs(1)));
        assert_eq!(limiter.len(), PRUNE_THRESHOLD + 1);

        // everything from t0 has expired, but the last sweep is too recent
        assert!(limiter.check_at("b", t0 + Duration::from_secs(10)));
        assert_eq!(limiter.len(), PRUNE_THRESHOLD + 2);

        // a full window after the last sweep it runs again; only "b" is still live
        assert!(limiter.check_at("c", t0 + Duration::from_secs(11)));
        assert_eq!(limiter.len(), 2);
        assert_eq!(limiter.count("b"), Some(1));
    }

    #[test]
    fn test_unlimited() {
        let limiter = Unlimited;
        assert!((0..100).all(|_| limiter.check_and_increment("x")));
    }
}
