//! Small stateless helpers shared across the crate: timestamps, address
//! parsing/validation, and endpoint URL building.
//!
//! The HMAC signing, decimal/tick math, retry, and rate-limiting helpers that
//! used to live here have moved to dedicated modules (`auth.rs`,
//! `numeric.rs`, `retry.rs`, `rate_limit.rs` respectively) so each concern
//! has exactly one implementation in the crate.

use crate::errors::{PolyfillError, Result};
use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// High-precision timestamp utilities
pub mod time {
    use super::*;

    /// Get current Unix timestamp in seconds
    #[inline]
    pub fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_secs()
    }

    /// Get current Unix timestamp in milliseconds
    #[inline]
    pub fn now_millis() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_millis() as u64
    }

    /// Get current Unix timestamp in microseconds
    #[inline]
    pub fn now_micros() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_micros() as u64
    }

    /// Get current Unix timestamp in nanoseconds
    #[inline]
    pub fn now_nanos() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_nanos()
    }

    /// Convert DateTime to Unix timestamp in seconds
    #[inline]
    pub fn datetime_to_secs(dt: DateTime<Utc>) -> u64 {
        dt.timestamp() as u64
    }

    /// Convert Unix timestamp to DateTime
    #[inline]
    pub fn secs_to_datetime(timestamp: u64) -> DateTime<Utc> {
        DateTime::from_timestamp(timestamp as i64, 0).unwrap_or_else(Utc::now)
    }
}

/// Address and token ID utilities
pub mod address {
    use super::*;

    /// Validate and parse Ethereum address
    pub fn parse_address(addr: &str) -> Result<Address> {
        Address::from_str(addr)
            .map_err(|e| PolyfillError::validation(format!("Invalid address format: {}", e)))
    }

    /// Validate token ID format
    pub fn validate_token_id(token_id: &str) -> Result<()> {
        if token_id.is_empty() {
            return Err(PolyfillError::validation("Token ID cannot be empty"));
        }

        if !token_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(PolyfillError::validation("Token ID must be numeric"));
        }

        Ok(())
    }

    /// Convert token ID to U256
    pub fn token_id_to_u256(token_id: &str) -> Result<U256> {
        validate_token_id(token_id)?;
        U256::from_str_radix(token_id, 10)
            .map_err(|e| PolyfillError::validation(format!("Invalid token ID: {}", e)))
    }
}

/// URL building utilities
pub mod url {
    use super::*;

    /// Build API endpoint URL
    pub fn build_endpoint(base_url: &str, path: &str) -> Result<String> {
        let base = base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(format!("{}/{}", base, path))
    }

    /// Add query parameters to URL
    pub fn add_query_params(mut url: url::Url, params: &[(&str, &str)]) -> url::Url {
        {
            let mut query_pairs = url.query_pairs_mut();
            for (key, value) in params {
                query_pairs.append_pair(key, value);
            }
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_validation() {
        use address::parse_address;

        let valid = "0x1234567890123456789012345678901234567890";
        assert!(parse_address(valid).is_ok());

        let invalid = "invalid_address";
        assert!(parse_address(invalid).is_err());
    }

    #[test]
    fn test_token_id_to_u256() {
        use address::token_id_to_u256;

        assert!(token_id_to_u256("12345").is_ok());
        assert!(token_id_to_u256("not_numeric").is_err());
        assert!(token_id_to_u256("").is_err());
    }

    #[test]
    fn test_build_endpoint() {
        use url::build_endpoint;

        assert_eq!(
            build_endpoint("https://clob.polymarket.com/", "/book").unwrap(),
            "https://clob.polymarket.com/book"
        );
    }
}
