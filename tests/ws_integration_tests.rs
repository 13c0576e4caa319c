// WebSocket integration tests for polyfill-rs
//
// These tests connect to Polymarket's live WS endpoints and are ignored by default.
//
// Run with:
//   cargo test --all-features --test ws_integration_tests -- --ignored --nocapture --test-threads=1

#![cfg(feature = "stream")]

use futures::StreamExt;
use polyclob_rs::rtds::{RtdsClient, TopicSubscription};
use polyclob_rs::{ClobClient, StreamMessage, WebSocketStream};
use std::env;
use std::time::Duration;

const HOST: &str = "https://clob.polymarket.com";
const WS_MARKET_URL: &str = "wss://ws-subscriptions-clob.polymarket.com/ws/market";

fn stability_secs(default_secs: u64) -> u64 {
    env::var("POLYFILL_WS_STABILITY_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default_secs)
}

#[tokio::test(flavor = "multi_thread")]
#[ignore]
async fn test_real_ws_market_channel_receives_book_update() {
    // Pick an active token ID so the market channel should produce data.
    let client = ClobClient::new(HOST);
    let markets = client
        .get_sampling_markets(None)
        .await
        .expect("failed to fetch markets");

    let token_id = markets
        .data
        .iter()
        .find(|m| m.active && !m.closed)
        .and_then(|m| m.tokens.first())
        .map(|t| t.token_id.clone())
        .expect("no active markets found");

    let mut ws = WebSocketStream::new(WS_MARKET_URL);
    ws.subscribe_market(token_id.clone())
        .await
        .expect("failed to subscribe market channel");

    let message = tokio::time::timeout(Duration::from_secs(10), ws.next())
        .await
        .expect("timed out waiting for WS message")
        .expect("WS stream ended unexpectedly")
        .expect("WS processing error");

    match message {
        StreamMessage::Book { .. } | StreamMessage::PriceChange { .. } | StreamMessage::Heartbeat { .. } => {}
        other => panic!("unexpected message on market channel: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
#[ignore]
async fn test_real_ws_market_channel_stays_connected() {
    let client = ClobClient::new(HOST);
    let markets = client
        .get_sampling_markets(None)
        .await
        .expect("failed to fetch markets");

    let token_id = markets
        .data
        .iter()
        .find(|m| m.active && !m.closed)
        .and_then(|m| m.tokens.first())
        .map(|t| t.token_id.clone())
        .expect("no active markets found");

    let mut ws = WebSocketStream::new(WS_MARKET_URL);
    ws.subscribe_market(token_id)
        .await
        .expect("failed to subscribe market channel");

    let deadline = Duration::from_secs(stability_secs(15));
    let mut received = 0u32;
    let _ = tokio::time::timeout(deadline, async {
        while ws.next().await.is_some() {
            received += 1;
        }
    })
    .await;

    assert!(received > 0, "expected at least one message over the stability window");
}

#[tokio::test(flavor = "multi_thread")]
#[ignore]
async fn test_real_rtds_subscribe_and_receive() {
    let (rtds, mut messages) = RtdsClient::new();
    rtds.connect().await.expect("failed to connect to RTDS");
    rtds.subscribe(TopicSubscription::new("clob_market", "agg_orderbook"))
        .await
        .expect("failed to subscribe to RTDS topic");

    let message = tokio::time::timeout(Duration::from_secs(10), messages.recv())
        .await
        .expect("timed out waiting for RTDS message")
        .expect("RTDS channel closed unexpectedly");

    assert!(!message.topic.is_empty());
}
