//! In-memory inbound rate limiting.
//!
//! Sliding-window limiter keyed by client address, for a single process.
//! State is not persisted across restarts.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default inbound policy: ten requests per client per minute.
pub const DEFAULT_MAX_REQUESTS: usize = 10;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window request limiter.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    hits: Mutex<HashMap<IpAddr, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Admit or reject one request from `client`. Admitted requests count
    /// against the window immediately.
    pub fn check(&self, client: IpAddr) -> bool {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: IpAddr, now: Instant) -> bool {
        let Ok(mut guard) = self.hits.lock() else {
            return true;
        };
        let window = self.window;
        let entry = guard.entry(client).or_default();
        entry.retain(|&hit| now.duration_since(hit) < window);
        if entry.len() >= self.max_requests {
            return false;
        }
        entry.push(now);
        true
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> IpAddr {
        "192.0.2.10".parse().unwrap()
    }

    #[test]
    fn admits_up_to_the_limit_then_rejects() {
        let limiter = RateLimiter::default();
        let now = Instant::now();
        for _ in 0..DEFAULT_MAX_REQUESTS {
            assert!(limiter.check_at(client(), now));
        }
        assert!(!limiter.check_at(client(), now));
    }

    #[test]
    fn readmits_after_the_window_slides() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();
        assert!(limiter.check_at(client(), start));
        assert!(limiter.check_at(client(), start));
        assert!(!limiter.check_at(client(), start));

        let later = start + Duration::from_secs(61);
        assert!(limiter.check_at(client(), later));
    }

    #[test]
    fn clients_are_limited_independently() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();
        let other: IpAddr = "192.0.2.20".parse().unwrap();
        assert!(limiter.check_at(client(), now));
        assert!(!limiter.check_at(client(), now));
        assert!(limiter.check_at(other, now));
    }
}
