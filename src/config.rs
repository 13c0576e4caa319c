//! Environment-sourced configuration.
//!
//! Grounded on `original_source/polymarket/config.py`. All tunables are read
//! from `PM_*` environment variables (the spec's naming, not the Python
//! original's `POLYMARKET_*` prefix) with validated ranges and documented
//! defaults. `.env` files are loaded via `dotenvy` the way the teacher crate
//! already does in its test harness.

use crate::errors::{PolyfillError, Result};
use crate::rate_limit::EndpointLimit;
use std::collections::HashMap;
use std::env;
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|_| PolyfillError::config(format!("{key} is not a valid value: '{val}'"))),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(PolyfillError::config(format!("{key}: {e}"))),
    }
}

/// Default rate-limit table: per-endpoint (limit, window) pairs. Any
/// endpoint not listed falls back to `default_rate_limit`.
#[derive(Debug, Clone)]
pub struct RateLimitTable {
    pub per_endpoint: HashMap<String, (u32, Duration)>,
    pub default: (u32, Duration),
}

impl RateLimitTable {
    fn from_env() -> Result<Self> {
        let default_limit: u32 = env_or("PM_RATE_LIMIT_DEFAULT_REQUESTS", 100)?;
        let default_window_secs: u64 = env_or("PM_RATE_LIMIT_DEFAULT_WINDOW_SECS", 10)?;

        let mut per_endpoint = HashMap::new();
        per_endpoint.insert(
            "/order".to_string(),
            (
                env_or("PM_RATE_LIMIT_ORDER_REQUESTS", 50)?,
                Duration::from_secs(env_or("PM_RATE_LIMIT_ORDER_WINDOW_SECS", 10)?),
            ),
        );
        per_endpoint.insert(
            "/book".to_string(),
            (
                env_or("PM_RATE_LIMIT_BOOK_REQUESTS", 100)?,
                Duration::from_secs(env_or("PM_RATE_LIMIT_BOOK_WINDOW_SECS", 10)?),
            ),
        );

        Ok(Self {
            per_endpoint,
            default: (default_limit, Duration::from_secs(default_window_secs)),
        })
    }

    pub fn limit_for(&self, endpoint: &str) -> Result<EndpointLimit> {
        let (limit, window) = self
            .per_endpoint
            .get(endpoint)
            .copied()
            .unwrap_or(self.default);
        EndpointLimit::new(limit, window)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub ws_market_url: String,
    pub ws_user_url: String,
    pub rtds_url: String,
    pub chain_id: u64,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub retry_max_attempts: usize,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    pub breaker_failure_threshold: u32,
    pub breaker_open_timeout: Duration,
    pub dedup_cleanup_delay: Duration,
    pub market_metadata_ttl: Duration,
    pub nonce_idle_ttl: Duration,
    pub ws_ping_interval: Duration,
    pub rate_limits: RateLimitTable,
}

impl Config {
    /// Load configuration from the process environment, first attempting to
    /// load a `.env` file (ignored if absent). Every numeric/duration field
    /// is validated; out-of-range or unparsable values are a `Config` error
    /// rather than a silent fallback.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let request_timeout_secs: u64 = env_or("PM_REQUEST_TIMEOUT_SECS", 30)?;
        let connect_timeout_secs: u64 = env_or("PM_CONNECT_TIMEOUT_SECS", 10)?;
        let retry_base_delay_ms: u64 = env_or("PM_RETRY_BASE_DELAY_MS", 100)?;
        let retry_max_delay_secs: u64 = env_or("PM_RETRY_MAX_DELAY_SECS", 10)?;
        let breaker_open_timeout_secs: u64 = env_or("PM_BREAKER_OPEN_TIMEOUT_SECS", 30)?;
        let dedup_cleanup_delay_ms: u64 = env_or("PM_DEDUP_CLEANUP_DELAY_MS", 100)?;
        let market_metadata_ttl_secs: u64 = env_or("PM_MARKET_METADATA_TTL_SECS", 300)?;
        let nonce_idle_ttl_secs: u64 = env_or("PM_NONCE_IDLE_TTL_SECS", 3600)?;
        let ws_ping_interval_secs: u64 = env_or("PM_WS_PING_INTERVAL_SECS", 5)?;

        let chain_id: u64 = env_or("PM_CHAIN_ID", 137)?;
        let retry_max_attempts: usize = env_or("PM_RETRY_MAX_ATTEMPTS", 4)?;
        let breaker_failure_threshold: u32 = env_or("PM_BREAKER_FAILURE_THRESHOLD", 5)?;
        let pool_max_idle_per_host: usize = env_or("PM_POOL_MAX_IDLE_PER_HOST", 100)?;

        if retry_max_attempts == 0 {
            return Err(PolyfillError::config("PM_RETRY_MAX_ATTEMPTS must be >= 1"));
        }
        if breaker_failure_threshold == 0 {
            return Err(PolyfillError::config(
                "PM_BREAKER_FAILURE_THRESHOLD must be >= 1",
            ));
        }

        Ok(Self {
            base_url: env::var("PM_BASE_URL")
                .unwrap_or_else(|_| "https://clob.polymarket.com".to_string()),
            ws_market_url: env::var("PM_WS_MARKET_URL")
                .unwrap_or_else(|_| "wss://ws-subscriptions-clob.polymarket.com/ws/market".to_string()),
            ws_user_url: env::var("PM_WS_USER_URL")
                .unwrap_or_else(|_| "wss://ws-subscriptions-clob.polymarket.com/ws/user".to_string()),
            rtds_url: env::var("PM_RTDS_URL")
                .unwrap_or_else(|_| "wss://ws-live-data.polymarket.com".to_string()),
            chain_id,
            request_timeout: Duration::from_secs(request_timeout_secs),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            pool_max_idle_per_host,
            retry_max_attempts,
            retry_base_delay: Duration::from_millis(retry_base_delay_ms),
            retry_max_delay: Duration::from_secs(retry_max_delay_secs),
            breaker_failure_threshold,
            breaker_open_timeout: Duration::from_secs(breaker_open_timeout_secs),
            dedup_cleanup_delay: Duration::from_millis(dedup_cleanup_delay_ms),
            market_metadata_ttl: Duration::from_secs(market_metadata_ttl_secs),
            nonce_idle_ttl: Duration::from_secs(nonce_idle_ttl_secs),
            ws_ping_interval: Duration::from_secs(ws_ping_interval_secs),
            rate_limits: RateLimitTable::from_env()?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env().unwrap_or_else(|_| Self {
            base_url: "https://clob.polymarket.com".to_string(),
            ws_market_url: "wss://ws-subscriptions-clob.polymarket.com/ws/market".to_string(),
            ws_user_url: "wss://ws-subscriptions-clob.polymarket.com/ws/user".to_string(),
            rtds_url: "wss://ws-live-data.polymarket.com".to_string(),
            chain_id: 137,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 100,
            retry_max_attempts: 4,
            retry_base_delay: Duration::from_millis(100),
            retry_max_delay: Duration::from_secs(10),
            breaker_failure_threshold: 5,
            breaker_open_timeout: Duration::from_secs(30),
            dedup_cleanup_delay: Duration::from_millis(100),
            market_metadata_ttl: Duration::from_secs(300),
            nonce_idle_ttl: Duration::from_secs(3600),
            ws_ping_interval: Duration::from_secs(5),
            rate_limits: RateLimitTable {
                per_endpoint: HashMap::new(),
                default: (100, Duration::from_secs(10)),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.chain_id, 137);
        assert!(config.retry_max_attempts >= 1);
    }

    #[test]
    fn rate_limit_falls_back_to_default() {
        let table = RateLimitTable {
            per_endpoint: HashMap::new(),
            default: (100, Duration::from_secs(10)),
        };
        let limit = table.limit_for("/unknown").unwrap();
        assert_eq!(limit.limit, 100);
    }
}
