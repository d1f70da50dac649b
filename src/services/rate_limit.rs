use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window request counter keyed by caller (user id or IP).
#[derive(Debug)]
pub struct RateLimiter {
    max: u32,
    window: Duration,
    hits: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            max,
            window,
            hits: DashMap::new(),
        }
    }

    pub fn per_hour(max: u32) -> Self {
        Self::new(max, Duration::from_secs(3600))
    }

    /// Counts one request for `key`; false once the window's budget is spent.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entry = self.hits.entry(key.to_string()).or_insert(Window {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_per_key() {
        let limiter = RateLimiter::per_hour(2);
        assert!(limiter.check("1"));
        assert!(limiter.check("1"));
        assert!(!limiter.check("1"));
        assert!(limiter.check("2"));
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new(1, Duration::ZERO);
        assert!(limiter.check("1"));
        assert!(limiter.check("1"));
    }
}
