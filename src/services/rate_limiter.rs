use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

/// Expired windows are swept only once this many clients are tracked.
const CLEANUP_THRESHOLD: usize = 1000;

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Records one request for `key`. Returns false once the key is over its
    /// budget for the current window.
    async fn check(&self, key: &str) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// In-memory fixed window counter keyed by client address.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    max: u32,
    window: Duration,
    cleanup_threshold: usize,
    windows: DashMap<String, Window>,
}

impl FixedWindowLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            max,
            window,
            cleanup_threshold: CLEANUP_THRESHOLD,
            windows: DashMap::new(),
        }
    }

    pub fn check_at(&self, key: &str, now: Instant) -> bool {
        // Must run before `entry()`: retain needs every shard lock.
        self.cleanup_if_needed(now);

        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }
        if entry.count >= self.max {
            return false;
        }
        entry.count += 1;
        true
    }

    fn cleanup_if_needed(&self, now: Instant) {
        if self.windows.len() > self.cleanup_threshold {
            self.windows
                .retain(|_, w| now.duration_since(w.started) < self.window);
        }
    }
}

#[async_trait]
impl RateLimiter for FixedWindowLimiter {
    async fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eleventh_request_in_window_is_rejected() {
        let limiter = FixedWindowLimiter::new(10, Duration::from_secs(60));
        let now = Instant::now();
        for _ in 0..10 {
            assert!(limiter.check_at("1.2.3.4", now));
        }
        assert!(!limiter.check_at("1.2.3.4", now + Duration::from_secs(59)));
    }

    #[test]
    fn new_window_resets_the_budget() {
        let limiter = FixedWindowLimiter::new(2, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.check_at("k", now));
        assert!(limiter.check_at("k", now));
        assert!(!limiter.check_at("k", now));
        assert!(limiter.check_at("k", now + Duration::from_secs(60)));
        assert!(limiter.check_at("k", now + Duration::from_secs(61)));
        assert!(!limiter.check_at("k", now + Duration::from_secs(62)));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.check_at("a", now));
        assert!(limiter.check_at("b", now));
        assert!(!limiter.check_at("a", now));
    }

    #[test]
    fn expired_windows_survive_below_the_threshold() {
        let limiter = FixedWindowLimiter::new(5, Duration::from_secs(10));
        let now = Instant::now();
        limiter.check_at("a", now);
        limiter.check_at("b", now);
        limiter.check_at("c", now + Duration::from_secs(11));
        assert_eq!(limiter.windows.len(), 3);
    }

    #[test]
    fn expired_windows_are_swept_past_the_threshold() {
        let limiter = FixedWindowLimiter {
            cleanup_threshold: 2,
            ..FixedWindowLimiter::new(5, Duration::from_secs(10))
        };
        let now = Instant::now();
        limiter.check_at("a", now);
        limiter.check_at("b", now);
        limiter.check_at("c", now);
        assert_eq!(limiter.windows.len(), 3);

        limiter.check_at("d", now + Duration::from_secs(11));
        assert_eq!(limiter.windows.len(), 1);
        assert!(limiter.windows.contains_key("d"));
    }
}
