//! Crate-wide error taxonomy.
//!
//! Every fallible operation in the crate returns [`PolyfillError`]. The
//! variants mirror the retry/circuit-breaker taxonomy: `is_retryable()`
//! tells callers (and `crate::retry`) whether an error represents a
//! transient condition worth retrying or a terminal one.

use std::fmt;

pub type Result<T> = std::result::Result<T, PolyfillError>;

/// Sub-kinds for order construction and lifecycle failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderErrorKind {
    InvalidPrice,
    InvalidSize,
    InvalidExpiration,
    InsufficientBalance,
    MissingMetadata,
    SigningFailed,
}

impl fmt::Display for OrderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderErrorKind::InvalidPrice => "invalid_price",
            OrderErrorKind::InvalidSize => "invalid_size",
            OrderErrorKind::InvalidExpiration => "invalid_expiration",
            OrderErrorKind::InsufficientBalance => "insufficient_balance",
            OrderErrorKind::MissingMetadata => "missing_metadata",
            OrderErrorKind::SigningFailed => "signing_failed",
        };
        f.write_str(s)
    }
}

/// Sub-kinds for market-data façade failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketDataErrorKind {
    NotFound,
    StaleCache,
    BadResponseShape,
}

impl fmt::Display for MarketDataErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarketDataErrorKind::NotFound => "not_found",
            MarketDataErrorKind::StaleCache => "stale_cache",
            MarketDataErrorKind::BadResponseShape => "bad_response_shape",
        };
        f.write_str(s)
    }
}

/// Sub-kinds for streaming-plane failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamErrorKind {
    ConnectFailed,
    SubscriptionRejected,
    Decode,
    LivenessTimeout,
    ReconnectExhausted,
}

impl fmt::Display for StreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StreamErrorKind::ConnectFailed => "connect_failed",
            StreamErrorKind::SubscriptionRejected => "subscription_rejected",
            StreamErrorKind::Decode => "decode",
            StreamErrorKind::LivenessTimeout => "liveness_timeout",
            StreamErrorKind::ReconnectExhausted => "reconnect_exhausted",
        };
        f.write_str(s)
    }
}

/// Sub-kinds for trading-façade failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradingErrorKind {
    NonceExhausted,
    ReserveConflict,
    OverRelease,
    NoCredentials,
}

impl fmt::Display for TradingErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradingErrorKind::NonceExhausted => "nonce_exhausted",
            TradingErrorKind::ReserveConflict => "reserve_conflict",
            TradingErrorKind::OverRelease => "over_release",
            TradingErrorKind::NoCredentials => "no_credentials",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PolyfillError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("authentication error: {0}")]
    Authentication(String),

    #[error("rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("circuit breaker open: {0}")]
    CircuitOpen(String),

    #[error("trading error ({kind}): {message}")]
    Trading {
        kind: TradingErrorKind,
        message: String,
    },

    #[error("balance tracking error: {0}")]
    BalanceTracking(String),

    #[error("stream error ({kind}): {message}")]
    Stream {
        kind: StreamErrorKind,
        message: String,
    },

    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("parse error: {message}")]
    Parse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("market data error ({kind}): {message}")]
    MarketData {
        kind: MarketDataErrorKind,
        message: String,
    },

    #[error("order error ({kind}): {message}")]
    Order {
        kind: OrderErrorKind,
        message: String,
    },
}

impl PolyfillError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    pub fn rate_limit(msg: impl Into<String>) -> Self {
        Self::RateLimit(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn circuit_open(msg: impl Into<String>) -> Self {
        Self::CircuitOpen(msg.into())
    }

    pub fn trading(message: impl Into<String>, kind: TradingErrorKind) -> Self {
        Self::Trading {
            kind,
            message: message.into(),
        }
    }

    pub fn balance_tracking(msg: impl Into<String>) -> Self {
        Self::BalanceTracking(msg.into())
    }

    pub fn stream(message: impl Into<String>, kind: StreamErrorKind) -> Self {
        Self::Stream {
            kind,
            message: message.into(),
        }
    }

    pub fn network<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn parse(message: impl Into<String>, source: Option<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Parse {
            message: message.into(),
            source,
        }
    }

    pub fn internal<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn crypto(msg: impl Into<String>) -> Self {
        Self::Crypto(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn market_data(message: impl Into<String>, kind: MarketDataErrorKind) -> Self {
        Self::MarketData {
            kind,
            message: message.into(),
        }
    }

    pub fn order(message: impl Into<String>, kind: OrderErrorKind) -> Self {
        Self::Order {
            kind,
            message: message.into(),
        }
    }

    /// Whether retrying the operation that produced this error could plausibly succeed.
    ///
    /// Mirrors the original client's retry taxonomy: network hiccups, timeouts, rate
    /// limits and 5xx API errors are retryable; validation, auth and circuit-open
    /// errors never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            PolyfillError::Network { .. } => true,
            PolyfillError::Timeout(_) => true,
            PolyfillError::RateLimit(_) => true,
            PolyfillError::Api { status, .. } => *status >= 500 || *status == 429,
            PolyfillError::CircuitOpen(_) => false,
            PolyfillError::Validation(_) => false,
            PolyfillError::Authentication(_) => false,
            PolyfillError::Crypto(_) => false,
            PolyfillError::Config(_) => false,
            PolyfillError::Parse { .. } => false,
            PolyfillError::Order { .. } => false,
            PolyfillError::Trading { .. } => false,
            PolyfillError::BalanceTracking(_) => false,
            PolyfillError::Stream { .. } => false,
            PolyfillError::MarketData { .. } => false,
            PolyfillError::Internal { .. } => false,
        }
    }
}

impl From<reqwest::Error> for PolyfillError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PolyfillError::Timeout(e.to_string())
        } else {
            PolyfillError::network(e.to_string(), e)
        }
    }
}

impl From<serde_json::Error> for PolyfillError {
    fn from(e: serde_json::Error) -> Self {
        PolyfillError::Parse {
            message: e.to_string(),
            source: Some(Box::new(e)),
        }
    }
}

impl From<url::ParseError> for PolyfillError {
    fn from(e: url::ParseError) -> Self {
        PolyfillError::validation(format!("invalid URL: {e}"))
    }
}

#[cfg(feature = "stream")]
impl From<tokio_tungstenite::tungstenite::Error> for PolyfillError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        PolyfillError::Stream {
            kind: StreamErrorKind::ConnectFailed,
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_taxonomy() {
        assert!(PolyfillError::api(502, "bad gateway").is_retryable());
        assert!(PolyfillError::api(429, "rate limited").is_retryable());
        assert!(!PolyfillError::api(400, "bad request").is_retryable());
        assert!(!PolyfillError::circuit_open("open").is_retryable());
        assert!(!PolyfillError::auth("bad sig").is_retryable());
    }
}
