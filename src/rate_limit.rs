//! Sliding-window rate limiter.
//!
//! Grounded on `original_source/polymarket/utils/rate_limiter.py`. Each
//! tracked endpoint gets its own deque of recent request timestamps and its
//! own lock; `acquire` never holds that lock across the sleep it may need to
//! perform, so one throttled endpoint can't stall requests to another.
//!
//! `effective_limit = floor((burst_or_limit) * margin)` lets callers shave a
//! safety margin off the exchange's advertised limit rather than dancing
//! right on the edge of a 429.

use crate::errors::{PolyfillError, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::time::sleep;

#[derive(Debug, Clone, Copy)]
pub struct EndpointLimit {
    /// Requests allowed per window.
    pub limit: u32,
    /// Window length.
    pub window: Duration,
    /// Safety margin in (0, 1], applied as `floor(limit * margin)`.
    pub margin: f64,
}

impl EndpointLimit {
    pub fn new(limit: u32, window: Duration) -> Result<Self> {
        Self::with_margin(limit, window, 0.9)
    }

    pub fn with_margin(limit: u32, window: Duration, margin: f64) -> Result<Self> {
        if limit == 0 {
            return Err(PolyfillError::config("rate limit must be > 0"));
        }
        if window.is_zero() {
            return Err(PolyfillError::config("rate limit window must be > 0"));
        }
        if !(0.0..=1.0).contains(&margin) || margin <= 0.0 {
            return Err(PolyfillError::config("rate limit margin must be in (0, 1]"));
        }
        Ok(Self {
            limit,
            window,
            margin,
        })
    }

    fn effective_limit(&self) -> usize {
        ((self.limit as f64) * self.margin).floor().max(1.0) as usize
    }
}

struct Window {
    config: EndpointLimit,
    timestamps: VecDeque<Instant>,
}

/// Per-endpoint sliding-window limiter.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    default_config: EndpointLimit,
}

impl RateLimiter {
    pub fn new(default_config: EndpointLimit) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            default_config,
        }
    }

    pub fn configure_endpoint(&self, endpoint: &str, config: EndpointLimit) {
        let mut guard = self.windows.lock().expect("rate limiter poisoned");
        guard.insert(
            endpoint.to_string(),
            Window {
                config,
                timestamps: VecDeque::new(),
            },
        );
    }

    /// How long the caller must wait before the endpoint has room, or `None`
    /// if it can proceed immediately. Prunes expired timestamps and records
    /// the attempt as a reservation when it returns `None`.
    fn check_and_reserve(&self, endpoint: &str) -> Option<Duration> {
        let mut guard = self.windows.lock().expect("rate limiter poisoned");
        let default_config = self.default_config;
        let window = guard.entry(endpoint.to_string()).or_insert_with(|| Window {
            config: default_config,
            timestamps: VecDeque::new(),
        });

        let now = Instant::now();
        while let Some(&oldest) = window.timestamps.front() {
            if now.duration_since(oldest) >= window.config.window {
                window.timestamps.pop_front();
            } else {
                break;
            }
        }

        let effective = window.config.effective_limit();
        if window.timestamps.len() < effective {
            window.timestamps.push_back(now);
            None
        } else {
            let oldest = *window.timestamps.front().expect("non-empty by len check");
            Some(window.config.window.saturating_sub(now.duration_since(oldest)))
        }
    }

    /// Block until the endpoint has capacity, then reserve a slot. Never
    /// holds the internal lock across the `sleep`.
    pub async fn acquire(&self, endpoint: &str) -> Result<()> {
        loop {
            match self.check_and_reserve(endpoint) {
                None => return Ok(()),
                Some(wait) => sleep(wait).await,
            }
        }
    }

    /// Non-blocking variant: returns a `RateLimit` error immediately instead
    /// of waiting, for callers that want to fail fast.
    pub fn try_acquire(&self, endpoint: &str) -> Result<()> {
        match self.check_and_reserve(endpoint) {
            None => Ok(()),
            Some(wait) => Err(PolyfillError::rate_limit(format!(
                "endpoint {endpoint} saturated, retry after {wait:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_blocks_until_window_clears() {
        let limiter = RateLimiter::new(EndpointLimit::with_margin(2, Duration::from_millis(50), 1.0).unwrap());
        limiter.acquire("/book").await.unwrap();
        limiter.acquire("/book").await.unwrap();
        let start = Instant::now();
        limiter.acquire("/book").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn try_acquire_fails_fast_when_saturated() {
        let limiter = RateLimiter::new(EndpointLimit::with_margin(1, Duration::from_secs(10), 1.0).unwrap());
        limiter.try_acquire("/book").unwrap();
        assert!(limiter.try_acquire("/book").is_err());
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(EndpointLimit::new(0, Duration::from_secs(1)).is_err());
        assert!(EndpointLimit::with_margin(10, Duration::from_secs(1), 0.0).is_err());
        assert!(EndpointLimit::with_margin(10, Duration::from_secs(1), 1.5).is_err());
    }
}
