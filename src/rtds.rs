//! Event-bus (RTDS) stream client — the richer, topic-based real-time data
//! feed alongside the CLOB channel in `stream.rs`.
//!
//! Wire protocol differs from the CLOB channel: subscribe/unsubscribe frames
//! are `{action, subscriptions:[{topic, type, filters?, clob_auth?}]}`;
//! inbound data messages carry `{topic, type, timestamp, payload,
//! connection_id}`; liveness is driven by an application-level literal
//! `"ping"` string rather than a WebSocket control frame, and the server
//! answers with a true WS pong frame. Grounded entirely in
//! `original_source/polymarket/api/real_time_data.py` — the teacher pack has
//! no equivalent client, only the CLOB channel's `stream.rs`, whose
//! reconnect/backoff structuring this follows.

use crate::errors::{PolyfillError, Result};
use crate::types::ApiCredentials;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

const DEFAULT_HOST: &str = "wss://ws-live-data.polymarket.com";
const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(300);

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;

/// Connection lifecycle state, reported to the status callback on every
/// transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

/// CLOB API credentials carried in `clob_auth`, required for the
/// `clob_user` topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClobAuthCreds {
    pub key: String,
    pub secret: String,
    pub passphrase: String,
}

impl From<&ApiCredentials> for ClobAuthCreds {
    fn from(creds: &ApiCredentials) -> Self {
        Self {
            key: creds.api_key.clone(),
            secret: creds.secret.clone(),
            passphrase: creds.passphrase.clone(),
        }
    }
}

/// One topic/type/filter subscription, as tracked for resubscription after
/// reconnect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicSubscription {
    pub topic: String,
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clob_auth: Option<ClobAuthCreds>,
}

impl TopicSubscription {
    pub fn new(topic: impl Into<String>, message_type: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            message_type: message_type.into(),
            filters: None,
            clob_auth: None,
        }
    }

    pub fn with_filters(mut self, filters: impl Into<String>) -> Self {
        self.filters = Some(filters.into());
        self
    }

    pub fn with_auth(mut self, auth: ClobAuthCreds) -> Self {
        self.clob_auth = Some(auth);
        self
    }

    /// Equality key ignoring `clob_auth`, matching the original's dedup rule
    /// of `(topic, type, filters)`.
    fn key(&self) -> (&str, &str, Option<&str>) {
        (&self.topic, &self.message_type, self.filters.as_deref())
    }
}

#[derive(Debug, Serialize)]
struct ActionFrame<'a> {
    action: &'a str,
    subscriptions: &'a [TopicSubscription],
}

/// A data message delivered on any subscribed topic.
#[derive(Debug, Clone, Deserialize)]
pub struct RtdsMessage {
    pub topic: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub timestamp: i64,
    pub payload: serde_json::Value,
    pub connection_id: String,
}

/// Snapshot of connection health, analogous to the original's `stats()`.
#[derive(Debug, Clone)]
pub struct RtdsStats {
    pub status: ConnectionStatus,
    pub connected: bool,
    pub uptime: Option<Duration>,
    pub active_subscriptions: usize,
    pub total_messages_received: u64,
    pub total_reconnections: u32,
    pub current_reconnect_attempts: u32,
    pub last_pong_age: Option<Duration>,
    pub auto_reconnect_enabled: bool,
}

#[derive(Debug, Default)]
struct Counters {
    total_messages_received: u64,
    total_reconnections: u32,
    current_reconnect_attempts: u32,
    connection_start: Option<Instant>,
    last_pong: Option<Instant>,
}

struct Shared {
    sink: Mutex<Option<WsSink>>,
    subscriptions: Mutex<Vec<TopicSubscription>>,
    status: Mutex<ConnectionStatus>,
    counters: Mutex<Counters>,
    shutdown: AtomicBool,
    message_tx: mpsc::UnboundedSender<RtdsMessage>,
    status_callback: Option<Box<dyn Fn(ConnectionStatus) + Send + Sync>>,
}

/// Event-bus real-time data client.
///
/// `connect()` spawns a background reader/pinger task that owns the socket;
/// `subscribe`/`unsubscribe` send directly over it and update the tracked
/// subscription list so a reconnect can replay every active subscription
/// before any callback observes the new connection, per spec.
pub struct RtdsClient {
    url: String,
    ping_interval: Duration,
    auto_reconnect: bool,
    shared: Arc<Shared>,
}

impl RtdsClient {
    /// Build a client against the default host
    /// (`wss://ws-live-data.polymarket.com`).
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RtdsMessage>) {
        Self::with_host(DEFAULT_HOST)
    }

    pub fn with_host(host: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<RtdsMessage>) {
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            sink: Mutex::new(None),
            subscriptions: Mutex::new(Vec::new()),
            status: Mutex::new(ConnectionStatus::Disconnected),
            counters: Mutex::new(Counters::default()),
            shutdown: AtomicBool::new(false),
            message_tx,
            status_callback: None,
        });

        (
            Self {
                url: host.into(),
                ping_interval: DEFAULT_PING_INTERVAL,
                auto_reconnect: true,
                shared,
            },
            message_rx,
        )
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Install a callback invoked on every CONNECTING/CONNECTED/DISCONNECTED
    /// transition. Must be set before `connect()`.
    pub fn with_status_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        Arc::get_mut(&mut self.shared)
            .expect("with_status_callback must run before connect()")
            .status_callback = Some(Box::new(callback));
        self
    }

    /// Connect and spawn the background reader/ping/reconnect task. The
    /// initial connection is established synchronously so a bad host or
    /// handshake failure surfaces to the caller immediately instead of only
    /// showing up in logs from the background task.
    pub async fn connect(&self) -> Result<()> {
        self.shared.shutdown.store(false, Ordering::SeqCst);
        let stream = open_connection(&self.url, &self.shared).await?;
        tokio::spawn(run(
            self.shared.clone(),
            self.url.clone(),
            self.ping_interval,
            self.auto_reconnect,
            stream,
        ));
        Ok(())
    }

    /// Close the connection and disable reconnection.
    pub async fn disconnect(&self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        if let Some(mut sink) = self.shared.sink.lock().await.take() {
            let _ = sink.close().await;
        }
        set_status(&self.shared, ConnectionStatus::Disconnected).await;
    }

    /// Subscribe to a topic. Duplicate `(topic, type, filters)` triples are
    /// not re-tracked (matching the original's dedup rule), though the wire
    /// frame is still sent.
    pub async fn subscribe(&self, subscription: TopicSubscription) -> Result<()> {
        send_action(&self.shared, "subscribe", std::slice::from_ref(&subscription)).await?;

        let mut subs = self.shared.subscriptions.lock().await;
        if !subs.iter().any(|s| s.key() == subscription.key()) {
            subs.push(subscription);
        }
        Ok(())
    }

    /// Unsubscribe from a topic, removing it from the tracked list so it is
    /// not replayed on the next reconnect.
    pub async fn unsubscribe(
        &self,
        topic: impl Into<String>,
        message_type: impl Into<String>,
        filters: Option<String>,
    ) -> Result<()> {
        let topic = topic.into();
        let message_type = message_type.into();
        let frame_sub = TopicSubscription {
            topic: topic.clone(),
            message_type: message_type.clone(),
            filters: filters.clone(),
            clob_auth: None,
        };
        send_action(&self.shared, "unsubscribe", std::slice::from_ref(&frame_sub)).await?;

        let mut subs = self.shared.subscriptions.lock().await;
        let key = (topic.as_str(), message_type.as_str(), filters.as_deref());
        subs.retain(|s| s.key() != key);
        Ok(())
    }

    pub async fn status(&self) -> ConnectionStatus {
        *self.shared.status.lock().await
    }

    pub async fn stats(&self) -> RtdsStats {
        let status = *self.shared.status.lock().await;
        let connected = self.shared.sink.lock().await.is_some();
        let counters = self.shared.counters.lock().await;
        let active_subscriptions = self.shared.subscriptions.lock().await.len();
        RtdsStats {
            status,
            connected,
            uptime: counters.connection_start.filter(|_| connected).map(|t| t.elapsed()),
            active_subscriptions,
            total_messages_received: counters.total_messages_received,
            total_reconnections: counters.total_reconnections,
            current_reconnect_attempts: counters.current_reconnect_attempts,
            last_pong_age: counters.last_pong.map(|t| t.elapsed()),
            auto_reconnect_enabled: self.auto_reconnect,
        }
    }
}

impl Default for RtdsClient {
    fn default() -> Self {
        Self::new().0
    }
}

async fn send_action(shared: &Arc<Shared>, action: &str, subscriptions: &[TopicSubscription]) -> Result<()> {
    let frame = ActionFrame { action, subscriptions };
    let text = serde_json::to_string(&frame)?;
    let mut guard = shared.sink.lock().await;
    match guard.as_mut() {
        Some(sink) => sink.send(WsMessage::Text(text)).await.map_err(Into::into),
        None => Err(PolyfillError::stream(
            "not connected",
            crate::errors::StreamErrorKind::ConnectFailed,
        )),
    }
}

async fn set_status(shared: &Arc<Shared>, status: ConnectionStatus) {
    *shared.status.lock().await = status;
    if let Some(callback) = &shared.status_callback {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(status)));
        if let Err(e) = result {
            error!("status callback panicked: {:?}", e);
        }
    }
}

type WsStream = futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Open a fresh connection, store its sink half in `shared` for
/// subscribe/unsubscribe/ping to use independently, resubscribe every
/// tracked subscription, and hand the read half back to the caller.
async fn open_connection(url: &str, shared: &Arc<Shared>) -> Result<WsStream> {
    set_status(shared, ConnectionStatus::Connecting).await;
    let (ws, _) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
        PolyfillError::stream(
            format!("RTDS connection failed: {e}"),
            crate::errors::StreamErrorKind::ConnectFailed,
        )
    })?;
    let (sink, stream) = ws.split();
    *shared.sink.lock().await = Some(sink);

    {
        let mut counters = shared.counters.lock().await;
        if counters.current_reconnect_attempts > 0 {
            counters.total_reconnections += 1;
        }
        counters.current_reconnect_attempts = 0;
        counters.connection_start = Some(Instant::now());
        counters.last_pong = Some(Instant::now());
    }

    let to_resend = shared.subscriptions.lock().await.clone();
    if !to_resend.is_empty() {
        info!("resubscribing to {} topics", to_resend.len());
        for sub in &to_resend {
            if let Err(e) = send_action(shared, "subscribe", std::slice::from_ref(sub)).await {
                error!("failed to resubscribe to {}: {e}", sub.topic);
            }
        }
    }

    set_status(shared, ConnectionStatus::Connected).await;
    Ok(stream)
}

/// Background task: owns the read half, sends app-level pings on a timer,
/// and reconnects with `min(2^attempts, 300s)` backoff on close/error.
/// `initial_stream` is the read half of the connection `connect()` already
/// established; every subsequent iteration opens a fresh one.
async fn run(
    shared: Arc<Shared>,
    url: String,
    ping_interval: Duration,
    auto_reconnect: bool,
    initial_stream: WsStream,
) {
    let mut next_stream = Some(initial_stream);

    loop {
        if shared.shutdown.load(Ordering::SeqCst) {
            return;
        }

        let stream = match next_stream.take() {
            Some(stream) => stream,
            None => match open_connection(&url, &shared).await {
                Ok(stream) => stream,
                Err(e) => {
                    if !auto_reconnect {
                        error!("RTDS connect failed, auto-reconnect disabled: {e}");
                        return;
                    }
                    schedule_backoff(&shared).await;
                    continue;
                }
            },
        };

        read_until_closed(&shared, stream, ping_interval).await;
        *shared.sink.lock().await = None;

        if shared.shutdown.load(Ordering::SeqCst) {
            return;
        }
        set_status(&shared, ConnectionStatus::Disconnected).await;
        if !auto_reconnect {
            return;
        }
        schedule_backoff(&shared).await;
    }
}

async fn schedule_backoff(shared: &Arc<Shared>) {
    let attempts = {
        let mut counters = shared.counters.lock().await;
        let attempts = counters.current_reconnect_attempts;
        counters.current_reconnect_attempts += 1;
        attempts
    };
    let delay = Duration::from_secs(2u64.saturating_pow(attempts)).min(MAX_RECONNECT_DELAY);
    info!("reconnecting in {:?} (attempt {})", delay, attempts + 1);
    tokio::time::sleep(delay).await;
}

/// Drives one connection's lifetime: reads frames, forwards data messages,
/// answers the exchange's own WS-level pings, and sends an app-level
/// `"ping"` text frame every `ping_interval`. Returns once the socket closes,
/// errors, or shutdown is requested — the caller decides whether to
/// reconnect.
async fn read_until_closed(shared: &Arc<Shared>, mut stream: WsStream, ping_interval: Duration) {
    let mut ticker = tokio::time::interval(ping_interval);
    ticker.tick().await; // first tick fires immediately; skip it

    loop {
        if shared.shutdown.load(Ordering::SeqCst) {
            return;
        }

        tokio::select! {
            _ = ticker.tick() => {
                if send_ping(shared).await.is_err() {
                    return;
                }
            }
            next = stream.next() => {
                match next {
                    Some(Ok(WsMessage::Text(text))) => {
                        if let Some(msg) = parse_frame(&text) {
                            shared.counters.lock().await.total_messages_received += 1;
                            if shared.message_tx.send(msg).is_err() {
                                debug!("RTDS message receiver dropped");
                            }
                        }
                    }
                    Some(Ok(WsMessage::Pong(_))) => {
                        debug!("pong received");
                        shared.counters.lock().await.last_pong = Some(Instant::now());
                    }
                    Some(Ok(WsMessage::Close(_))) => {
                        info!("RTDS connection closed by server");
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("RTDS read error: {e}");
                        return;
                    }
                    None => {
                        debug!("RTDS stream ended");
                        return;
                    }
                }
            }
        }
    }
}

async fn send_ping(shared: &Arc<Shared>) -> Result<()> {
    let mut guard = shared.sink.lock().await;
    match guard.as_mut() {
        Some(sink) => {
            sink.send(WsMessage::Text("ping".to_string()))
                .await
                .map_err(PolyfillError::from)?;
            debug!("ping sent");
            Ok(())
        }
        None => Err(PolyfillError::stream(
            "not connected",
            crate::errors::StreamErrorKind::ConnectFailed,
        )),
    }
}

/// Parse one inbound frame. Non-JSON frames (the literal `"pong"` the
/// exchange might echo, or anything not starting with `{`) are ignored.
/// Frames without a `payload` are subscription acknowledgements, logged only.
fn parse_frame(text: &str) -> Option<RtdsMessage> {
    let trimmed = text.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    let value: serde_json::Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(e) => {
            warn!("failed to parse RTDS message: {e}");
            return None;
        }
    };
    if value.get("payload").is_none() {
        debug!("RTDS system message: {value}");
        return None;
    }
    match serde_json::from_value(value) {
        Ok(msg) => Some(msg),
        Err(e) => {
            warn!("failed to decode RTDS message payload: {e}");
            None
        }
    }
}

#[allow(dead_code)]
fn record_message(counters: &mut Counters) {
    counters.total_messages_received += 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_subscription_dedup_key_ignores_auth() {
        let a = TopicSubscription::new("activity", "trades").with_auth(ClobAuthCreds {
            key: "k".into(),
            secret: "s".into(),
            passphrase: "p".into(),
        });
        let b = TopicSubscription::new("activity", "trades");
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn subscribe_frame_matches_wire_shape() {
        let sub = TopicSubscription::new("activity", "trades").with_filters(r#"{"market_slug":"trump-2024"}"#);
        let frame = ActionFrame {
            action: "subscribe",
            subscriptions: std::slice::from_ref(&sub),
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["action"], "subscribe");
        assert_eq!(value["subscriptions"][0]["topic"], "activity");
        assert_eq!(value["subscriptions"][0]["type"], "trades");
        assert!(value["subscriptions"][0]["filters"].is_string());
        assert!(value["subscriptions"][0].get("clob_auth").is_none());
    }

    #[test]
    fn parse_frame_ignores_non_json() {
        assert!(parse_frame("pong").is_none());
        assert!(parse_frame("ping").is_none());
    }

    #[test]
    fn parse_frame_ignores_system_messages_without_payload() {
        let ack = r#"{"subscriptions":[{"topic":"activity","type":"trades"}]}"#;
        assert!(parse_frame(ack).is_none());
    }

    #[test]
    fn parse_frame_decodes_data_message() {
        let msg = r#"{"topic":"activity","type":"trades","timestamp":1700000000000,"payload":{"price":"0.5"},"connection_id":"abc"}"#;
        let parsed = parse_frame(msg).expect("should parse");
        assert_eq!(parsed.topic, "activity");
        assert_eq!(parsed.message_type, "trades");
        assert_eq!(parsed.connection_id, "abc");
    }

    #[tokio::test]
    async fn reconnect_backoff_doubles_and_caps() {
        let (_client, _rx) = RtdsClient::new();
        let shared = Arc::new(Shared {
            sink: Mutex::new(None),
            subscriptions: Mutex::new(Vec::new()),
            status: Mutex::new(ConnectionStatus::Disconnected),
            counters: Mutex::new(Counters::default()),
            shutdown: AtomicBool::new(false),
            message_tx: mpsc::unbounded_channel().0,
            status_callback: None,
        });
        for _ in 0..3 {
            let attempts_before = shared.counters.lock().await.current_reconnect_attempts;
            let delay = Duration::from_secs(2u64.saturating_pow(attempts_before)).min(MAX_RECONNECT_DELAY);
            assert!(delay <= MAX_RECONNECT_DELAY);
            shared.counters.lock().await.current_reconnect_attempts += 1;
        }
    }
}
