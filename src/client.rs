//! High-level client for Polymarket's CLOB REST API.
//!
//! Market-data calls and order construction/signing/submission go through
//! [`crate::transport::Transport`] (rate limiting, retry/circuit-breaking, GET
//! dedup) and [`crate::cache::MarketMetadataCache`] (tick size / neg-risk /
//! fee rate). Authentication and signing are per-wallet, via
//! [`crate::credentials::CredentialRegistry`] — one `ClobClient` can hold many
//! wallets, each independently authenticated. Order placement is brokered by
//! [`crate::trading::TradingFacade`], which reserves funds before submission
//! and releases them if the exchange rejects the order.

use crate::auth::{create_l1_headers, create_l2_headers};
use crate::cache::MarketMetadataCache;
use crate::config::Config;
use crate::credentials::{CredentialRegistry, SignatureType, WalletId};
use crate::errors::{PolyfillError, Result};
use crate::nonce::NonceManager;
use crate::trading::{AvailableBalance, ReservedBalanceLedger, TradingFacade};
use crate::transport::Transport;
use crate::types::{BalanceAllowanceParams, OrderOptions, PostOrder, SignedOrderRequest};
use alloy_primitives::U256;
use reqwest::Method;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

// Re-export types for compatibility
pub use crate::types::{ApiCredentials as ApiCreds, OrderType, Side};

// Compatibility types
#[derive(Debug)]
pub struct OrderArgs {
    pub token_id: String,
    pub price: Decimal,
    pub size: Decimal,
    pub side: Side,
}

impl OrderArgs {
    pub fn new(token_id: &str, price: Decimal, size: Decimal, side: Side) -> Self {
        Self {
            token_id: token_id.to_string(),
            price,
            size,
            side,
        }
    }
}

impl Default for OrderArgs {
    fn default() -> Self {
        Self {
            token_id: "".to_string(),
            price: Decimal::ZERO,
            size: Decimal::ZERO,
            side: Side::BUY,
        }
    }
}

/// Main client for interacting with the Polymarket CLOB API.
pub struct ClobClient {
    transport: Arc<Transport>,
    base_url: String,
    chain_id: u64,
    metadata_cache: Arc<MarketMetadataCache>,
    trading: TradingFacade,
}

impl ClobClient {
    fn from_config(config: Config) -> Self {
        let transport =
            Arc::new(Transport::new(&config).expect("failed to build HTTP transport"));
        Self {
            transport,
            base_url: config.base_url,
            chain_id: config.chain_id,
            metadata_cache: Arc::new(MarketMetadataCache::new()),
            trading: TradingFacade::new(
                Arc::new(CredentialRegistry::new()),
                Arc::new(NonceManager::new()),
                Arc::new(ReservedBalanceLedger::new()),
            ),
        }
    }

    /// Create a new client with default pooling/timeout settings.
    pub fn new(host: &str) -> Self {
        Self::from_config(Config {
            base_url: host.to_string(),
            ..Config::default()
        })
    }

    /// Create a client tuned for co-located environments: a bigger
    /// connection pool and tighter timeouts than the default profile.
    pub fn new_colocated(host: &str) -> Self {
        Self::from_config(Config {
            base_url: host.to_string(),
            pool_max_idle_per_host: 200,
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            ..Config::default()
        })
    }

    /// Create a client tuned for higher-latency internet connections:
    /// a smaller pool and more generous timeouts than the default profile.
    pub fn new_internet(host: &str) -> Self {
        Self::from_config(Config {
            base_url: host.to_string(),
            pool_max_idle_per_host: 20,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            ..Config::default()
        })
    }

    /// Create a client and register one EOA wallet for L1 (signature-based)
    /// authentication. The wallet becomes the client's default wallet.
    pub fn with_l1_headers(host: &str, private_key: &str, chain_id: u64) -> Self {
        let client = Self::from_config(Config {
            base_url: host.to_string(),
            chain_id,
            ..Config::default()
        });
        client
            .trading
            .credentials
            .add_wallet(private_key, SignatureType::Eoa, None)
            .expect("invalid private key");
        client
    }

    /// Like [`Self::with_l1_headers`], additionally attaching L2 (API key)
    /// credentials to the registered wallet.
    pub fn with_l2_headers(host: &str, private_key: &str, chain_id: u64, api_creds: ApiCreds) -> Self {
        let client = Self::with_l1_headers(host, private_key, chain_id);
        let wallet = client
            .trading
            .credentials
            .default_wallet()
            .expect("wallet was just added");
        client
            .trading
            .credentials
            .set_api_credentials(wallet, api_creds)
            .expect("wallet was just added");
        client
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    // -- multi-wallet management ------------------------------------------

    /// Register an additional wallet. The first wallet ever added to a
    /// client becomes its default; every wallet after that must be selected
    /// explicitly (or promoted with [`Self::set_default_wallet`]).
    pub fn add_wallet(
        &self,
        private_key: &str,
        sig_type: SignatureType,
        funder: Option<alloy_primitives::Address>,
    ) -> Result<WalletId> {
        self.trading.credentials.add_wallet(private_key, sig_type, funder)
    }

    pub fn set_default_wallet(&self, wallet: WalletId) -> Result<()> {
        self.trading.credentials.set_default(wallet)
    }

    pub fn set_api_creds(&self, wallet: Option<WalletId>, api_creds: ApiCreds) -> Result<()> {
        let wallet = self.resolve_wallet(wallet)?;
        self.trading.credentials.set_api_credentials(wallet, api_creds)
    }

    pub fn wallets(&self) -> Vec<WalletId> {
        self.trading.credentials.addresses()
    }

    fn resolve_wallet(&self, wallet: Option<WalletId>) -> Result<WalletId> {
        match wallet {
            Some(w) => Ok(w),
            None => self
                .trading
                .credentials
                .default_wallet()
                .ok_or_else(|| PolyfillError::auth("no wallet configured on this client")),
        }
    }

    fn sig_type_for(&self, wallet: WalletId) -> Result<u8> {
        self.trading
            .credentials
            .with_wallet(wallet, |_, _, sig_type, _| sig_type.as_u8())
    }

    fn l1_headers_for(
        &self,
        wallet: WalletId,
        nonce: Option<U256>,
    ) -> Result<HashMap<&'static str, String>> {
        let chain_id = self.chain_id;
        self.trading
            .credentials
            .with_wallet(wallet, |signer, _, _, _| {
                create_l1_headers(signer, nonce, chain_id)
            })?
    }

    fn l2_headers_for<T: ?Sized + serde::Serialize>(
        &self,
        wallet: WalletId,
        method: &str,
        path: &str,
        body: Option<&T>,
    ) -> Result<HashMap<&'static str, String>> {
        self.trading.credentials.with_wallet(wallet, |signer, _, _, api_creds| {
            let creds = api_creds.ok_or_else(|| PolyfillError::auth("API credentials not set"))?;
            create_l2_headers(signer, creds, method, path, body)
        })?
    }

    /// Get the wallet's on-chain address, hex-encoded.
    pub fn get_address(&self, wallet: Option<WalletId>) -> Result<String> {
        use alloy_primitives::hex;
        let wallet = self.resolve_wallet(wallet)?;
        self.trading
            .credentials
            .with_wallet(wallet, |signer, _, _, _| hex::encode_prefixed(signer.address().as_slice()))
    }

    /// Get the collateral token address for the current chain
    pub fn get_collateral_address(&self) -> Option<String> {
        let config = crate::orders::get_contract_config(self.chain_id, false)?;
        Some(config.collateral)
    }

    /// Get the conditional tokens contract address for the current chain
    pub fn get_conditional_address(&self) -> Option<String> {
        let config = crate::orders::get_contract_config(self.chain_id, false)?;
        Some(config.conditional_tokens)
    }

    /// Get the exchange contract address for the current chain
    pub fn get_exchange_address(&self) -> Option<String> {
        let config = crate::orders::get_contract_config(self.chain_id, false)?;
        Some(config.exchange)
    }

    // -- market data ---------------------------------------------------------

    /// Test basic connectivity
    pub async fn get_ok(&self) -> bool {
        self.transport.get_json::<Value>("/ok", &[]).await.is_ok()
    }

    /// Get server time
    pub async fn get_server_time(&self) -> Result<u64> {
        self.transport.get_json("/time", &[]).await
    }

    /// Get order book for a token
    pub async fn get_order_book(&self, token_id: &str) -> Result<OrderBookSummary> {
        self.transport.get_json("/book", &[("token_id", token_id)]).await
    }

    /// Get midpoint for a token
    pub async fn get_midpoint(&self, token_id: &str) -> Result<MidpointResponse> {
        self.transport.get_json("/midpoint", &[("token_id", token_id)]).await
    }

    /// Get spread for a token
    pub async fn get_spread(&self, token_id: &str) -> Result<SpreadResponse> {
        self.transport.get_json("/spread", &[("token_id", token_id)]).await
    }

    /// Get spreads for multiple tokens (batch)
    pub async fn get_spreads(&self, token_ids: &[String]) -> Result<HashMap<String, Decimal>> {
        let request_data = token_id_batch_body(token_ids);
        self.transport.post_json("/spreads", &HashMap::new(), &request_data).await
    }

    /// Get price for a token and side
    pub async fn get_price(&self, token_id: &str, side: Side) -> Result<PriceResponse> {
        self.transport
            .get_json("/price", &[("token_id", token_id), ("side", side.as_str())])
            .await
    }

    fn validate_prices_history_asset_id(asset_id: &str) -> Result<()> {
        if asset_id.is_empty() {
            return Err(PolyfillError::validation(
                "asset_id is required (use the decimal token_id / asset_id)",
            ));
        }

        // Common footgun: passing a condition id (0x...) instead of the decimal asset id.
        if asset_id.starts_with("0x") || asset_id.starts_with("0X") {
            return Err(PolyfillError::validation(
                "`/prices-history` expects a decimal token_id/asset_id, not a hex condition_id",
            ));
        }

        if !asset_id.as_bytes().iter().all(u8::is_ascii_digit) {
            return Err(PolyfillError::validation(
                "asset_id must be a decimal string (token_id / asset_id)",
            ));
        }

        Ok(())
    }

    /// Get price history for a single outcome (`token_id` / `asset_id`) over a fixed interval.
    ///
    /// Important: the upstream API query parameter is named `market`, but it expects the
    /// decimal outcome asset id (not the hex `condition_id`).
    pub async fn get_prices_history_interval(
        &self,
        asset_id: &str,
        interval: PricesHistoryInterval,
        fidelity: Option<u32>,
    ) -> Result<PricesHistoryResponse> {
        Self::validate_prices_history_asset_id(asset_id)?;

        let fidelity_str = fidelity.map(|f| f.to_string());
        let mut params = vec![("market", asset_id), ("interval", interval.as_str())];
        if let Some(f) = fidelity_str.as_deref() {
            params.push(("fidelity", f));
        }
        self.transport.get_json("/prices-history", &params).await
    }

    /// Get price history for a single outcome (`token_id` / `asset_id`) over a timestamp range.
    ///
    /// `start_ts` and `end_ts` are Unix timestamps (seconds).
    pub async fn get_prices_history_range(
        &self,
        asset_id: &str,
        start_ts: u64,
        end_ts: u64,
        fidelity: Option<u32>,
    ) -> Result<PricesHistoryResponse> {
        Self::validate_prices_history_asset_id(asset_id)?;

        if start_ts >= end_ts {
            return Err(PolyfillError::validation(
                "start_ts must be < end_ts for prices history",
            ));
        }

        let start_str = start_ts.to_string();
        let end_str = end_ts.to_string();
        let fidelity_str = fidelity.map(|f| f.to_string());
        let mut params = vec![("market", asset_id), ("startTs", start_str.as_str()), ("endTs", end_str.as_str())];
        if let Some(f) = fidelity_str.as_deref() {
            params.push(("fidelity", f));
        }
        self.transport.get_json("/prices-history", &params).await
    }

    /// Get tick size for a token (uncached — always hits the exchange).
    pub async fn get_tick_size(&self, token_id: &str) -> Result<Decimal> {
        let resp: crate::types::TickSizeResponse =
            self.transport.get_json("/tick-size", &[("token_id", token_id)]).await?;
        Ok(resp.minimum_tick_size)
    }

    /// Get neg risk for a token (uncached — always hits the exchange).
    pub async fn get_neg_risk(&self, token_id: &str) -> Result<bool> {
        let resp: crate::types::NegRiskResponse =
            self.transport.get_json("/neg-risk", &[("token_id", token_id)]).await?;
        Ok(resp.neg_risk)
    }

    /// Get maker fee rate (in bps) for a token (uncached — always hits the exchange).
    pub async fn get_fee_rate_bps(&self, token_id: &str) -> Result<u32> {
        let resp: crate::types::FeeRateResponse =
            self.transport.get_json("/fee-rate", &[("token_id", token_id)]).await?;
        Ok(resp.fee_rate_bps)
    }

    /// Resolve tick size, neg-risk and fee rate for `token_id`, through the
    /// shared market-metadata cache (5-minute TTL) instead of one HTTP round
    /// trip per field per order.
    async fn cached_metadata(&self, token_id: &str) -> Result<crate::cache::MarketMetadata> {
        self.metadata_cache
            .get_or_fetch(token_id, || async move {
                let tick_size = self.get_tick_size(token_id).await?;
                let neg_risk = self.get_neg_risk(token_id).await?;
                let fee_rate_bps = self.get_fee_rate_bps(token_id).await?;
                Ok(crate::cache::MarketMetadata {
                    tick_size,
                    neg_risk,
                    fee_rate_bps,
                })
            })
            .await
    }

    /// Get filled order options, resolving any unset fields from cached
    /// market metadata. A caller-supplied `tick_size` below the exchange
    /// minimum is rejected rather than silently widened.
    async fn get_filled_order_options(
        &self,
        token_id: &str,
        options: Option<&OrderOptions>,
    ) -> Result<OrderOptions> {
        let (tick_size, neg_risk, fee_rate_bps) = match options {
            Some(o) => (o.tick_size, o.neg_risk, o.fee_rate_bps),
            None => (None, None, None),
        };

        let metadata = self.cached_metadata(token_id).await?;

        let tick_size = match tick_size {
            None => metadata.tick_size,
            Some(t) if t >= metadata.tick_size => t,
            Some(t) => {
                return Err(PolyfillError::validation(format!(
                    "Tick size {} is smaller than min_tick_size {} for token_id: {}",
                    t, metadata.tick_size, token_id
                )))
            }
        };

        Ok(OrderOptions {
            tick_size: Some(tick_size),
            neg_risk: Some(neg_risk.unwrap_or(metadata.neg_risk)),
            fee_rate_bps: fee_rate_bps.or(Some(metadata.fee_rate_bps)),
        })
    }

    /// Check if price is in valid range
    fn is_price_in_range(price: Decimal, tick_size: Decimal) -> bool {
        let min_price = tick_size;
        let max_price = Decimal::ONE - tick_size;
        price >= min_price && price <= max_price
    }

    /// Create and sign an order, using `wallet` (or the client's default
    /// wallet) to sign it. If `extras` is not supplied, a fresh nonce is
    /// drawn from the per-wallet nonce manager rather than defaulting to
    /// zero.
    pub async fn create_order(
        &self,
        wallet: Option<WalletId>,
        order_args: &OrderArgs,
        order_type: OrderType,
        expiration: Option<u64>,
        extras: Option<crate::types::ExtraOrderArgs>,
        options: Option<&OrderOptions>,
    ) -> Result<SignedOrderRequest> {
        let wallet = self.resolve_wallet(wallet)?;
        let create_order_options = self.get_filled_order_options(&order_args.token_id, options).await?;
        let expiration = expiration.unwrap_or(0);
        let tick_size = create_order_options
            .tick_size
            .expect("filled by get_filled_order_options");

        if !Self::is_price_in_range(order_args.price, tick_size) {
            return Err(PolyfillError::validation(
                "Price is not in range of tick_size",
            ));
        }

        let extras = match extras {
            Some(e) => e,
            None => {
                let fee_rate_bps = create_order_options.fee_rate_bps.unwrap_or(0);
                let nonces = self.trading.nonces.clone();
                self.trading.credentials.with_wallet(wallet, |signer, _, _, _| {
                    crate::types::ExtraOrderArgs {
                        taker: "0x0000000000000000000000000000000000000000".to_string(),
                        fee_rate_bps,
                        nonce: U256::from(nonces.next(signer.address())),
                    }
                })?
            }
        };

        self.trading
            .credentials
            .with_wallet(wallet, |signer, funder, sig_type, _| {
                let builder = crate::orders::OrderBuilder::new(signer.clone(), Some(sig_type), Some(funder));
                builder.create_order(
                    self.chain_id,
                    order_args,
                    order_type,
                    expiration,
                    &extras,
                    &create_order_options,
                )
            })?
    }

    /// Calculate market price from order book
    async fn calculate_market_price(
        &self,
        wallet: WalletId,
        token_id: &str,
        side: Side,
        amount: Decimal,
    ) -> Result<Decimal> {
        let book = self.get_order_book(token_id).await?;

        // Convert OrderSummary to BookLevel
        let levels: Vec<crate::types::BookLevel> = match side {
            Side::BUY => book
                .asks
                .into_iter()
                .map(|s| crate::types::BookLevel {
                    price: s.price,
                    size: s.size,
                })
                .collect(),
            Side::SELL => book
                .bids
                .into_iter()
                .map(|s| crate::types::BookLevel {
                    price: s.price,
                    size: s.size,
                })
                .collect(),
        };

        self.trading
            .credentials
            .with_wallet(wallet, |signer, funder, sig_type, _| {
                let builder = crate::orders::OrderBuilder::new(signer.clone(), Some(sig_type), Some(funder));
                builder.calculate_market_price(&levels, amount)
            })?
    }

    /// Create a market order
    pub async fn create_market_order(
        &self,
        wallet: Option<WalletId>,
        order_args: &crate::types::MarketOrderArgs,
        extras: Option<crate::types::ExtraOrderArgs>,
        options: Option<&OrderOptions>,
    ) -> Result<SignedOrderRequest> {
        let wallet = self.resolve_wallet(wallet)?;
        let create_order_options = self.get_filled_order_options(&order_args.token_id, options).await?;
        let extras = match extras {
            Some(e) => e,
            None => {
                let fee_rate_bps = create_order_options.fee_rate_bps.unwrap_or(0);
                let nonces = self.trading.nonces.clone();
                self.trading.credentials.with_wallet(wallet, |signer, _, _, _| {
                    crate::types::ExtraOrderArgs {
                        taker: "0x0000000000000000000000000000000000000000".to_string(),
                        fee_rate_bps,
                        nonce: U256::from(nonces.next(signer.address())),
                    }
                })?
            }
        };
        let price = self
            .calculate_market_price(wallet, &order_args.token_id, Side::BUY, order_args.amount)
            .await?;

        let tick_size = create_order_options
            .tick_size
            .expect("filled by get_filled_order_options");
        if !Self::is_price_in_range(price, tick_size) {
            return Err(PolyfillError::validation(
                "Price is not in range of tick_size",
            ));
        }

        self.trading
            .credentials
            .with_wallet(wallet, |signer, funder, sig_type, _| {
                let builder = crate::orders::OrderBuilder::new(signer.clone(), Some(sig_type), Some(funder));
                builder.create_market_order(self.chain_id, order_args, price, &extras, &create_order_options)
            })?
    }

    /// Post a previously-signed order to the exchange.
    pub async fn post_order(
        &self,
        wallet: Option<WalletId>,
        order: SignedOrderRequest,
        order_type: OrderType,
    ) -> Result<Value> {
        let wallet = self.resolve_wallet(wallet)?;

        let (body, headers) = self.trading.credentials.with_wallet(wallet, |signer, _, _, api_creds| {
            let creds = api_creds.ok_or_else(|| PolyfillError::auth("API credentials not set"))?;
            let body = PostOrder::new(order, creds.api_key.clone(), order_type);
            let headers = create_l2_headers(signer, creds, "POST", "/order", Some(&body))?;
            Ok::<_, PolyfillError>((body, headers))
        })??;

        let body_value = serde_json::to_value(&body)?;
        self.transport
            .request_json(Method::POST, "/order", &[], &headers, Some(&body_value))
            .await
    }

    /// Create, sign, reserve-and-submit an order in one call. Routes through
    /// [`TradingFacade::place_order`], which checks available balance,
    /// reserves funds before submission and releases them if the exchange
    /// rejects the order.
    pub async fn create_and_post_order(
        &self,
        wallet: Option<WalletId>,
        order_args: &OrderArgs,
    ) -> Result<Value> {
        let wallet = self.resolve_wallet(wallet)?;
        let options = self.get_filled_order_options(&order_args.token_id, None).await?;
        let available = self.fetch_available_balance(wallet, &order_args.token_id).await?;

        let response_slot: std::sync::Mutex<Option<Value>> = std::sync::Mutex::new(None);
        self.trading
            .place_order(
                wallet,
                self.chain_id,
                order_args,
                OrderType::GTC,
                0,
                &options,
                available,
                |signed_order| async {
                    let response = self.post_order(Some(wallet), signed_order, OrderType::GTC).await?;
                    *response_slot.lock().expect("response slot poisoned") = Some(response);
                    Ok(())
                },
            )
            .await?;

        response_slot
            .lock()
            .expect("response slot poisoned")
            .take()
            .ok_or_else(|| PolyfillError::internal(
                "order accepted but no response captured",
                std::io::Error::new(std::io::ErrorKind::Other, "missing submit response"),
            ))
    }

    /// Pull available collateral and outcome-token balance for `token_id`
    /// from `/balance-allowance`, scaling the raw integer-unit response down
    /// to decimal units (both collateral and outcome tokens use 6 decimals).
    async fn fetch_available_balance(&self, wallet: WalletId, token_id: &str) -> Result<AvailableBalance> {
        let collateral_raw = self
            .get_balance_allowance(
                Some(wallet),
                Some(BalanceAllowanceParams {
                    asset_type: crate::types::AssetType::Collateral,
                    token_id: None,
                    signature_type: None,
                }),
            )
            .await?;
        let token_raw = self
            .get_balance_allowance(
                Some(wallet),
                Some(BalanceAllowanceParams {
                    asset_type: crate::types::AssetType::Conditional,
                    token_id: Some(token_id.to_string()),
                    signature_type: None,
                }),
            )
            .await?;

        const MICRO_UNITS: i64 = 1_000_000;
        let scale = Decimal::from(MICRO_UNITS);
        let parse_balance = |v: &Value| -> Result<Decimal> {
            v.get("balance")
                .and_then(Value::as_str)
                .and_then(|s| Decimal::from_str(s).ok())
                .ok_or_else(|| PolyfillError::parse("invalid balance-allowance response shape", None))
        };

        Ok(AvailableBalance {
            collateral: parse_balance(&collateral_raw)? / scale,
            token: parse_balance(&token_raw)? / scale,
        })
    }

    /// Cancel an order
    pub async fn cancel(&self, wallet: Option<WalletId>, order_id: &str) -> Result<Value> {
        let wallet = self.resolve_wallet(wallet)?;
        let body = HashMap::from([("orderID", order_id)]);
        let headers = self.l2_headers_for(wallet, "DELETE", "/order", Some(&body))?;
        let body_value = serde_json::to_value(&body)?;
        self.transport
            .request_json(Method::DELETE, "/order", &[], &headers, Some(&body_value))
            .await
    }

    /// Cancel multiple orders
    pub async fn cancel_orders(&self, wallet: Option<WalletId>, order_ids: &[String]) -> Result<Value> {
        let wallet = self.resolve_wallet(wallet)?;
        let headers = self.l2_headers_for(wallet, "DELETE", "/orders", Some(order_ids))?;
        let body_value = serde_json::to_value(order_ids)?;
        self.transport
            .request_json(Method::DELETE, "/orders", &[], &headers, Some(&body_value))
            .await
    }

    /// Cancel all orders
    pub async fn cancel_all(&self, wallet: Option<WalletId>) -> Result<Value> {
        let wallet = self.resolve_wallet(wallet)?;
        let headers = self.l2_headers_for::<Value>(wallet, "DELETE", "/cancel-all", None)?;
        self.transport
            .request_json(Method::DELETE, "/cancel-all", &[], &headers, None)
            .await
    }

    /// Cancel market orders with optional filters
    pub async fn cancel_market_orders(
        &self,
        wallet: Option<WalletId>,
        market: Option<&str>,
        asset_id: Option<&str>,
    ) -> Result<Value> {
        let wallet = self.resolve_wallet(wallet)?;
        let body = HashMap::from([
            ("market", market.unwrap_or("")),
            ("asset_id", asset_id.unwrap_or("")),
        ]);
        let headers = self.l2_headers_for(wallet, "DELETE", "/cancel-market-orders", Some(&body))?;
        let body_value = serde_json::to_value(&body)?;
        self.transport
            .request_json(Method::DELETE, "/cancel-market-orders", &[], &headers, Some(&body_value))
            .await
    }

    /// Drop (delete) notifications by IDs
    pub async fn drop_notifications(&self, wallet: Option<WalletId>, ids: &[String]) -> Result<Value> {
        let wallet = self.resolve_wallet(wallet)?;
        let headers = self.l2_headers_for::<Value>(wallet, "DELETE", "/notifications", None)?;
        let joined = ids.join(",");
        self.transport
            .request_json(Method::DELETE, "/notifications", &[("ids", joined.as_str())], &headers, None)
            .await
    }

    /// Get open orders with optional filtering
    ///
    /// This retrieves all open orders for the authenticated user. You can filter by:
    /// - Order ID (exact match)
    /// - Asset/Token ID (all orders for a specific token)
    /// - Market ID (all orders for a specific market)
    ///
    /// The response includes order status, fill information, and timestamps.
    pub async fn get_orders(
        &self,
        wallet: Option<WalletId>,
        params: Option<&crate::types::OpenOrderParams>,
        next_cursor: Option<&str>,
    ) -> Result<Vec<crate::types::OpenOrder>> {
        let wallet = self.resolve_wallet(wallet)?;
        let endpoint = "/data/orders";
        let headers = self.l2_headers_for::<Value>(wallet, "GET", endpoint, None)?;
        let owned_query = match params {
            None => Vec::new(),
            Some(p) => p.to_query_params(),
        };

        let mut cursor = next_cursor.unwrap_or("MA==").to_string(); // INITIAL_CURSOR
        let mut output = Vec::new();

        while cursor != "LTE=" {
            // END_CURSOR
            let mut query: Vec<(&str, &str)> = owned_query.iter().map(|(k, v)| (*k, v.as_str())).collect();
            query.push(("next_cursor", cursor.as_str()));

            let resp: Value = self.transport.request_json(Method::GET, endpoint, &query, &headers, None).await?;

            cursor = resp["next_cursor"]
                .as_str()
                .ok_or_else(|| PolyfillError::parse("Failed to parse next cursor".to_string(), None))?
                .to_owned();

            let orders = serde_json::from_value::<Vec<crate::types::OpenOrder>>(resp["data"].clone()).map_err(|e| {
                PolyfillError::parse(format!("Failed to parse data from order response: {}", e), None)
            })?;
            output.extend(orders);
        }

        Ok(output)
    }

    /// Get single order by ID
    pub async fn get_order(&self, wallet: Option<WalletId>, order_id: &str) -> Result<crate::types::OpenOrder> {
        let wallet = self.resolve_wallet(wallet)?;
        let endpoint = format!("/data/order/{}", order_id);
        let headers = self.l2_headers_for::<Value>(wallet, "GET", &endpoint, None)?;
        self.transport.request_json(Method::GET, &endpoint, &[], &headers, None).await
    }

    /// Get trade history with optional filtering
    ///
    /// This retrieves historical trades for the authenticated user. You can filter by:
    /// - Trade ID (exact match)
    /// - Maker address (trades where you were the maker)
    /// - Market ID (trades in a specific market)
    /// - Asset/Token ID (trades for a specific token)
    /// - Time range (before/after timestamps)
    ///
    /// Trades are returned in reverse chronological order (newest first).
    pub async fn get_trades(
        &self,
        wallet: Option<WalletId>,
        trade_params: Option<&crate::types::TradeParams>,
        next_cursor: Option<&str>,
    ) -> Result<Vec<Value>> {
        let wallet = self.resolve_wallet(wallet)?;
        let endpoint = "/data/trades";
        let headers = self.l2_headers_for::<Value>(wallet, "GET", endpoint, None)?;
        let owned_query = match trade_params {
            None => Vec::new(),
            Some(p) => p.to_query_params(),
        };

        let mut cursor = next_cursor.unwrap_or("MA==").to_string(); // INITIAL_CURSOR
        let mut output = Vec::new();

        while cursor != "LTE=" {
            // END_CURSOR
            let mut query: Vec<(&str, &str)> = owned_query.iter().map(|(k, v)| (*k, v.as_str())).collect();
            query.push(("next_cursor", cursor.as_str()));

            let resp: Value = self.transport.request_json(Method::GET, endpoint, &query, &headers, None).await?;

            cursor = resp["next_cursor"]
                .as_str()
                .ok_or_else(|| PolyfillError::parse("Failed to parse next cursor".to_string(), None))?
                .to_owned();

            output.push(resp["data"].clone());
        }

        Ok(output)
    }

    /// Get balance and allowance information for one asset
    ///
    /// This returns the current balance and allowance for an asset in your account.
    /// Balance is how much you own, allowance is how much the exchange can spend on your behalf.
    ///
    /// You need both balance and allowance to place orders - the exchange needs permission
    /// to move your tokens when orders are filled.
    pub async fn get_balance_allowance(
        &self,
        wallet: Option<WalletId>,
        params: Option<BalanceAllowanceParams>,
    ) -> Result<Value> {
        let wallet = self.resolve_wallet(wallet)?;
        let mut params = params.unwrap_or_default();
        if params.signature_type.is_none() {
            params.set_signature_type(self.sig_type_for(wallet)?);
        }
        let owned_query = params.to_query_params();
        let query: Vec<(&str, &str)> = owned_query.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let headers = self.l2_headers_for::<Value>(wallet, "GET", "/balance-allowance", None)?;
        self.transport
            .request_json(Method::GET, "/balance-allowance", &query, &headers, None)
            .await
    }

    /// Update balance allowance
    pub async fn update_balance_allowance(
        &self,
        wallet: Option<WalletId>,
        params: Option<BalanceAllowanceParams>,
    ) -> Result<()> {
        let wallet = self.resolve_wallet(wallet)?;
        let mut params = params.unwrap_or_default();
        if params.signature_type.is_none() {
            params.set_signature_type(self.sig_type_for(wallet)?);
        }
        let owned_query = params.to_query_params();
        let query: Vec<(&str, &str)> = owned_query.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let headers = self.l2_headers_for::<Value>(wallet, "GET", "/balance-allowance/update", None)?;
        let _: Value = self
            .transport
            .request_json(Method::GET, "/balance-allowance/update", &query, &headers, None)
            .await?;
        Ok(())
    }

    /// Set up notifications for order fills and other events
    ///
    /// This configures push notifications so you get alerted when:
    /// - Your orders get filled
    /// - Your orders get cancelled
    /// - Market conditions change significantly
    ///
    /// The signature proves you own the account and want to receive notifications.
    pub async fn get_notifications(&self, wallet: Option<WalletId>) -> Result<Value> {
        let wallet = self.resolve_wallet(wallet)?;
        let headers = self.l2_headers_for::<Value>(wallet, "GET", "/notifications", None)?;
        let sig_type = self.sig_type_for(wallet)?.to_string();
        self.transport
            .request_json(Method::GET, "/notifications", &[("signature_type", sig_type.as_str())], &headers, None)
            .await
    }

    /// Check if an order is scoring
    pub async fn is_order_scoring(&self, wallet: Option<WalletId>, order_id: &str) -> Result<bool> {
        let wallet = self.resolve_wallet(wallet)?;
        let headers = self.l2_headers_for::<Value>(wallet, "GET", "/order-scoring", None)?;
        let result: Value = self
            .transport
            .request_json(Method::GET, "/order-scoring", &[("order_id", order_id)], &headers, None)
            .await?;
        Ok(result["scoring"].as_bool().unwrap_or(false))
    }

    /// Check if multiple orders are scoring
    pub async fn are_orders_scoring(
        &self,
        wallet: Option<WalletId>,
        order_ids: &[&str],
    ) -> Result<HashMap<String, bool>> {
        let wallet = self.resolve_wallet(wallet)?;
        let headers = self.l2_headers_for(wallet, "POST", "/orders-scoring", Some(order_ids))?;
        let body_value = serde_json::to_value(order_ids)?;
        self.transport
            .request_json(Method::POST, "/orders-scoring", &[], &headers, Some(&body_value))
            .await
    }

    /// Create a new API key
    pub async fn create_api_key(&self, wallet: Option<WalletId>, nonce: Option<U256>) -> Result<ApiCreds> {
        let wallet = self.resolve_wallet(wallet)?;
        let headers = self.l1_headers_for(wallet, nonce)?;
        self.transport
            .request_json(Method::POST, "/auth/api-key", &[], &headers, None)
            .await
    }

    /// Derive an existing API key
    pub async fn derive_api_key(&self, wallet: Option<WalletId>, nonce: Option<U256>) -> Result<ApiCreds> {
        let wallet = self.resolve_wallet(wallet)?;
        let headers = self.l1_headers_for(wallet, nonce)?;
        self.transport
            .request_json(Method::GET, "/auth/derive-api-key", &[], &headers, None)
            .await
    }

    /// Create or derive API key (try create first, fallback to derive)
    pub async fn create_or_derive_api_key(&self, wallet: Option<WalletId>, nonce: Option<U256>) -> Result<ApiCreds> {
        let wallet = self.resolve_wallet(wallet)?;
        match self.create_api_key(Some(wallet), nonce).await {
            Ok(creds) => Ok(creds),
            // Only fall back to derive on API status errors (server responded).
            // Propagate network/parse/internal errors so callers can handle them appropriately.
            Err(PolyfillError::Api { .. }) => self.derive_api_key(Some(wallet), nonce).await,
            Err(err) => Err(err),
        }
    }

    /// Get all API keys for the authenticated user
    pub async fn get_api_keys(&self, wallet: Option<WalletId>) -> Result<Vec<String>> {
        let wallet = self.resolve_wallet(wallet)?;
        let headers = self.l2_headers_for::<Value>(wallet, "GET", "/auth/api-keys", None)?;
        let resp: crate::types::ApiKeysResponse =
            self.transport.request_json(Method::GET, "/auth/api-keys", &[], &headers, None).await?;
        Ok(resp.api_keys)
    }

    /// Delete the current API key
    pub async fn delete_api_key(&self, wallet: Option<WalletId>) -> Result<String> {
        let wallet = self.resolve_wallet(wallet)?;
        let headers = self.l2_headers_for::<Value>(wallet, "DELETE", "/auth/api-key", None)?;
        let resp: Value = self
            .transport
            .request_json(Method::DELETE, "/auth/api-key", &[], &headers, None)
            .await?;
        Ok(resp.as_str().map(str::to_string).unwrap_or_else(|| resp.to_string()))
    }

    /// Get midpoints for multiple tokens in a single request
    ///
    /// This is much more efficient than calling get_midpoint() multiple times.
    /// Instead of N round trips, you make just 1 request and get all the midpoints back.
    ///
    /// Midpoints are returned as a HashMap where the key is the token_id and the value
    /// is the midpoint price (or None if there's no valid midpoint).
    pub async fn get_midpoints(&self, token_ids: &[String]) -> Result<HashMap<String, Decimal>> {
        let request_data = token_id_batch_body(token_ids);
        self.transport.post_json("/midpoints", &HashMap::new(), &request_data).await
    }

    /// Get bid/ask/mid prices for multiple tokens in a single request
    ///
    /// This gives you the full price picture for multiple tokens at once.
    /// Much more efficient than individual calls, especially when you're tracking
    /// a portfolio or comparing multiple markets.
    ///
    /// Returns bid (best buy price), ask (best sell price), and mid (average) for each token.
    pub async fn get_prices(
        &self,
        book_params: &[crate::types::BookParams],
    ) -> Result<HashMap<String, HashMap<Side, Decimal>>> {
        let request_data: Vec<HashMap<&str, String>> = book_params
            .iter()
            .map(|params| {
                let mut map = HashMap::new();
                map.insert("token_id", params.token_id.clone());
                map.insert("side", params.side.as_str().to_string());
                map
            })
            .collect();

        self.transport.post_json("/prices", &HashMap::new(), &request_data).await
    }

    /// Get order book for multiple tokens (batch) - reference implementation compatible
    pub async fn get_order_books(&self, token_ids: &[String]) -> Result<Vec<OrderBookSummary>> {
        let request_data = token_id_batch_body(token_ids);
        self.transport.post_json("/books", &HashMap::new(), &request_data).await
    }

    /// Get last trade price for a token
    pub async fn get_last_trade_price(&self, token_id: &str) -> Result<Value> {
        self.transport.get_json("/last-trade-price", &[("token_id", token_id)]).await
    }

    /// Get last trade prices for multiple tokens
    pub async fn get_last_trade_prices(&self, token_ids: &[String]) -> Result<Value> {
        let request_data = token_id_batch_body(token_ids);
        self.transport.post_json("/last-trades-prices", &HashMap::new(), &request_data).await
    }

    /// Get sampling markets with pagination
    pub async fn get_sampling_markets(&self, next_cursor: Option<&str>) -> Result<crate::types::MarketsResponse> {
        let next_cursor = next_cursor.unwrap_or("MA=="); // INITIAL_CURSOR
        self.transport.get_json("/sampling-markets", &[("next_cursor", next_cursor)]).await
    }

    /// Get sampling simplified markets with pagination
    pub async fn get_sampling_simplified_markets(
        &self,
        next_cursor: Option<&str>,
    ) -> Result<crate::types::SimplifiedMarketsResponse> {
        let next_cursor = next_cursor.unwrap_or("MA=="); // INITIAL_CURSOR
        self.transport
            .get_json("/sampling-simplified-markets", &[("next_cursor", next_cursor)])
            .await
    }

    /// Get markets with pagination
    pub async fn get_markets(&self, next_cursor: Option<&str>) -> Result<crate::types::MarketsResponse> {
        let next_cursor = next_cursor.unwrap_or("MA=="); // INITIAL_CURSOR
        self.transport.get_json("/markets", &[("next_cursor", next_cursor)]).await
    }

    /// Get simplified markets with pagination
    pub async fn get_simplified_markets(
        &self,
        next_cursor: Option<&str>,
    ) -> Result<crate::types::SimplifiedMarketsResponse> {
        let next_cursor = next_cursor.unwrap_or("MA=="); // INITIAL_CURSOR
        self.transport.get_json("/simplified-markets", &[("next_cursor", next_cursor)]).await
    }

    /// Get single market by condition ID
    pub async fn get_market(&self, condition_id: &str) -> Result<crate::types::Market> {
        let endpoint = format!("/markets/{}", condition_id);
        self.transport.get_json(&endpoint, &[]).await
    }

    /// Get market trades events
    pub async fn get_market_trades_events(&self, condition_id: &str) -> Result<Value> {
        let endpoint = format!("/live-activity/events/{}", condition_id);
        self.transport.get_json(&endpoint, &[]).await
    }
}

/// Build the `[{"token_id": "..."}]` body shared by every batch market-data endpoint.
fn token_id_batch_body(token_ids: &[String]) -> Vec<HashMap<&'static str, String>> {
    token_ids
        .iter()
        .map(|id| {
            let mut map = HashMap::new();
            map.insert("token_id", id.clone());
            map
        })
        .collect()
}

// Re-export types from the canonical location in types.rs
pub use crate::types::{
    ExtraOrderArgs, Market, MarketOrderArgs, MarketsResponse, MidpointResponse, NegRiskResponse,
    OrderBookSummary, PriceResponse, PricesHistoryInterval, PricesHistoryResponse, SimplifiedMarketsResponse,
    SpreadResponse, TickSizeResponse, Token,
};

// Compatibility types that need to stay in client.rs
#[derive(Debug, Default)]
pub struct CreateOrderOptions {
    pub tick_size: Option<Decimal>,
    pub neg_risk: Option<bool>,
}

// Re-export for compatibility
pub type PolyfillClient = ClobClient;
