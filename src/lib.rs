//! polyclob-rs: a Rust client for Polymarket's CLOB
//!
//! # Features
//!
//! - Market-data façade (orders, order book, prices, markets) over the CLOB REST API
//! - EIP-712 order signing and submission, with pre-flight balance reservation
//! - CLOB-channel and RTDS WebSocket streaming
//! - Rate limiting, retries with circuit breaking, and a market-metadata cache
//! - Environment-sourced configuration and redaction-aware structured logging
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use polyclob_rs::{ClobClient, OrderArgs, Side};
//! use rust_decimal::Decimal;
//! use std::str::FromStr;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClobClient::with_l1_headers(
//!         "https://clob.polymarket.com",
//!         "your_private_key",
//!         137,
//!     );
//!
//!     let api_creds = client.create_or_derive_api_key(None, None).await?;
//!     client.set_api_creds(None, api_creds)?;
//!
//!     let order_args = OrderArgs::new(
//!         "token_id",
//!         Decimal::from_str("0.75")?,
//!         Decimal::from_str("100.0")?,
//!         Side::BUY,
//!     );
//!
//!     let result = client.create_and_post_order(None, &order_args).await?;
//!     println!("Order posted: {:?}", result);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Advanced Usage
//!
//! ```rust,no_run
//! use polyclob_rs::rtds::{RtdsClient, TopicSubscription};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (rtds, mut messages) = RtdsClient::new();
//!     rtds.connect().await?;
//!     rtds.subscribe(TopicSubscription::new("clob_market", "agg_orderbook")).await?;
//!
//!     while let Some(message) = messages.recv().await {
//!         println!("Received: {:?}", message);
//!     }
//!
//!     Ok(())
//! }
//! ```

// Global constants
pub const DEFAULT_CHAIN_ID: u64 = 137; // Polygon
pub const DEFAULT_BASE_URL: &str = "https://clob.polymarket.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RATE_LIMIT_RPS: u32 = 100;

/// Initialize structured, redaction-aware logging for the process.
pub fn init() {
    crate::logging::init();
}

// Re-export main types
pub use crate::types::{
    ApiCredentials, ApiKeysResponse, AssetType, Balance, BalanceAllowanceParams, BookParams,
    ClientConfig, FillEvent, Market, MarketOrderRequest, MarketSnapshot, MarketsResponse,
    MidpointResponse, NegRiskResponse, OpenOrder, OpenOrderParams, Order, OrderBook, OrderDelta,
    OrderRequest, OrderStatus, OrderType, PostOrder, PriceResponse, PricesHistoryInterval,
    PricesHistoryResponse, SimplifiedMarketsResponse, Side, SpreadResponse, StreamMessage,
    TickSizeResponse, Token, TradeParams, WssAuth, WssChannelType, WssSubscription,
};

// Re-export client
pub use crate::client::{ClobClient, PolyfillClient};

// Re-export compatibility types (for easy migration from polymarket-rs-client)
pub use crate::client::{OrderArgs, OrderBookSummary};

// Re-export error types
pub use crate::errors::{PolyfillError, Result};

// Re-export advanced components
pub use crate::book::{OrderBook as OrderBookImpl, OrderBookManager};
pub use crate::stream::{MarketStream, StreamManager, WebSocketStream};
pub use crate::trading::TradingFacade;

// Module declarations
pub mod auth;
pub mod book;
pub mod cache;
pub mod client;
pub mod config;
pub mod credentials;
pub mod ctf;
pub mod errors;
pub mod logging;
pub mod nonce;
pub mod numeric;
pub mod orders;
pub mod rate_limit;
pub mod retry;
pub mod rtds;
pub mod stream;
pub mod trading;
pub mod transport;
pub mod types;
pub mod utils;

// Benchmarks
#[cfg(test)]
mod benches {
    use crate::{OrderBookManager, OrderDelta, Side};
    use chrono::Utc;
    use criterion::{criterion_group, criterion_main};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn order_book_benchmark(c: &mut criterion::Criterion) {
        let mut book_manager = OrderBookManager::new(100);

        c.bench_function("apply_order_delta", |b| {
            b.iter(|| {
                let delta = OrderDelta {
                    token_id: "test_token".to_string(),
                    timestamp: Utc::now(),
                    side: Side::BUY,
                    price: Decimal::from_str("0.75").unwrap(),
                    size: Decimal::from_str("100.0").unwrap(),
                    sequence: 1,
                };

                let _ = book_manager.apply_delta(delta);
            });
        });
    }

    criterion_group!(benches, order_book_benchmark);
    criterion_main!(benches);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_client_creation() {
        let _client = ClobClient::new("https://test.example.com");
    }

    #[test]
    fn test_order_args_creation() {
        let args = OrderArgs::new(
            "test_token",
            Decimal::from_str("0.75").unwrap(),
            Decimal::from_str("100.0").unwrap(),
            Side::BUY,
        );

        assert_eq!(args.token_id, "test_token");
        assert_eq!(args.side, Side::BUY);
    }

    #[test]
    fn test_order_args_default() {
        let args = OrderArgs::default();
        assert_eq!(args.token_id, "");
        assert_eq!(args.price, Decimal::ZERO);
        assert_eq!(args.size, Decimal::ZERO);
        assert_eq!(args.side, Side::BUY);
    }
}
