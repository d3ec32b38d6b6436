//! Realtime channel integration tests against a mock transport.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};

use estate_core::error::AppError;
use estate_realtime::{ConnectionState, RealtimeChannel};

use crate::helpers::{self, Harness, settle};

fn record(channel: &RealtimeChannel, event: &str) -> Arc<Mutex<Vec<Value>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    channel.on(event, move |payload| {
        sink.lock().unwrap().push(payload.clone());
        Ok(())
    });
    seen
}

fn millis(d: Duration) -> u128 {
    d.as_millis()
}

// ── Handshake ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_connect_authenticates_with_stored_token() {
    let h = Harness::new();
    let token = h.login(3600);
    let channel = h.channel();
    let connected = record(&channel, "connected");
    let authenticated = record(&channel, "authenticated");

    channel.init(Some("t-1".to_string()));
    settle().await;

    assert_eq!(h.connector.attempts(), 1);
    let server = h.connector.latest();
    assert_eq!(
        server.received(),
        vec![json!({"type": "authenticate", "token": token, "tenant_id": "t-1"})]
    );
    assert_eq!(connected.lock().unwrap().len(), 1);
    assert!(
        h.notifier
            .messages()
            .contains(&"Connected to real-time updates".to_string())
    );

    let status = channel.status();
    assert!(status.connected);
    assert!(!status.authenticated);

    server.authenticate();
    settle().await;

    let status = channel.status();
    assert!(status.authenticated);
    assert_eq!(status.state, ConnectionState::OpenAuthenticated);
    assert_eq!(authenticated.lock().unwrap()[0]["user_id"], 42);
}

#[tokio::test(start_paused = true)]
async fn test_authenticate_reads_renewed_token() {
    let h = Harness::new();
    h.login(3600);
    let channel = h.channel();
    channel.init(None);
    settle().await;
    h.connector.latest().close();
    settle().await;

    let renewed = helpers::admin_token(h.now(), 7200);
    h.store.set_token(&renewed).unwrap();
    helpers::advance(Duration::from_millis(3000)).await;

    assert_eq!(h.connector.server_count(), 2);
    let auth = h.connector.latest().received_of("authenticate");
    assert_eq!(auth, vec![json!({"type": "authenticate", "token": renewed})]);
}

#[tokio::test(start_paused = true)]
async fn test_connect_is_noop_while_active() {
    let h = Harness::new();
    h.login(3600);
    let channel = h.channel();
    channel.connect();
    settle().await;
    channel.connect();
    settle().await;
    assert_eq!(h.connector.attempts(), 1);
}

// ── Reconnect ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_backoff_schedule_then_degraded() {
    let h = Harness::new();
    h.login(3600);
    h.connector.refuse.store(true, Ordering::SeqCst);
    let channel = h.channel();
    let disconnected = record(&channel, "disconnected");

    channel.connect();
    settle().await;
    assert_eq!(h.connector.attempts(), 1);
    assert_eq!(
        channel.status().state,
        ConnectionState::Closed {
            attempts: 1,
            retrying: true
        }
    );

    // Nothing fires a millisecond early.
    helpers::advance(Duration::from_millis(2999)).await;
    assert_eq!(h.connector.attempts(), 1);
    helpers::advance(Duration::from_millis(1)).await;
    assert_eq!(h.connector.attempts(), 2);

    for delay in [6000, 12_000, 24_000, 30_000] {
        helpers::advance(Duration::from_millis(delay)).await;
    }
    assert_eq!(h.connector.attempts(), 6);

    helpers::advance(Duration::from_secs(120)).await;
    assert_eq!(h.connector.attempts(), 6);

    let times = h.connector.attempt_times.lock().unwrap().clone();
    let gaps: Vec<u128> = times.windows(2).map(|w| millis(w[1] - w[0])).collect();
    assert_eq!(gaps, vec![3000, 6000, 12_000, 24_000, 30_000]);

    assert_eq!(
        channel.status().state,
        ConnectionState::Closed {
            attempts: 5,
            retrying: false
        }
    );
    assert_eq!(
        h.notifier
            .count_containing("Lost connection to real-time updates"),
        1
    );
    assert_eq!(disconnected.lock().unwrap().len(), 6);
    assert!(h.reporter.contexts().contains(&"realtime.connect".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_manual_connect_after_degraded_starts_fresh_budget() {
    let h = Harness::new();
    h.login(3600);
    h.connector.refuse.store(true, Ordering::SeqCst);
    let channel = h.channel();

    channel.connect();
    settle().await;
    for delay in [3000, 6000, 12_000, 24_000, 30_000] {
        helpers::advance(Duration::from_millis(delay)).await;
    }
    assert_eq!(h.connector.attempts(), 6);

    channel.connect();
    settle().await;
    assert_eq!(h.connector.attempts(), 7);
    assert_eq!(channel.status().reconnect_attempts, 1);

    helpers::advance(Duration::from_millis(3000)).await;
    assert_eq!(h.connector.attempts(), 8);
}

#[tokio::test(start_paused = true)]
async fn test_successful_authentication_resets_backoff() {
    let h = Harness::new();
    h.login(3600);
    let channel = h.channel();

    channel.connect();
    settle().await;
    h.connector.latest().close();
    settle().await;
    helpers::advance(Duration::from_millis(3000)).await;
    h.connector.latest().close();
    settle().await;
    assert_eq!(channel.status().reconnect_attempts, 2);

    helpers::advance(Duration::from_millis(6000)).await;
    h.connector.latest().authenticate();
    settle().await;
    assert_eq!(channel.status().reconnect_attempts, 0);

    h.connector.latest().close();
    settle().await;
    assert_eq!(
        channel.status().state,
        ConnectionState::Closed {
            attempts: 1,
            retrying: true
        }
    );
    helpers::advance(Duration::from_millis(3000)).await;
    assert_eq!(h.connector.attempts(), 4);
}

// ── Subscriptions ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_queued_subscriptions_sent_once_after_authentication() {
    let h = Harness::new();
    h.login(3600);
    let channel = h.channel();

    assert!(channel.subscribe_to_company(7));
    assert!(channel.subscribe_to_user(42));
    assert!(!channel.subscribe_to_company(7));

    channel.init(None);
    settle().await;
    let server = h.connector.latest();
    assert!(server.received_of("subscribe").is_empty());

    server.authenticate();
    settle().await;
    let expected = vec![
        json!({"type": "subscribe", "channel": "company_7"}),
        json!({"type": "subscribe", "channel": "user_42"}),
    ];
    assert_eq!(server.received_of("subscribe"), expected);

    // A repeated `authenticated` frame does not replay.
    server.authenticate();
    settle().await;
    assert_eq!(server.received_of("subscribe"), expected);

    assert!(channel.subscribe_to_allocation(3));
    assert_eq!(server.received_of("subscribe").len(), 3);

    assert!(channel.unsubscribe("user_42"));
    assert!(!channel.unsubscribe("user_42"));
    assert_eq!(
        server.received_of("unsubscribe"),
        vec![json!({"type": "unsubscribe", "channel": "user_42"})]
    );
    assert_eq!(channel.subscriptions(), vec!["company_7", "allocation_3"]);
}

#[tokio::test(start_paused = true)]
async fn test_subscriptions_replayed_after_reconnect() {
    let h = Harness::new();
    h.login(3600);
    let channel = h.channel();
    channel.subscribe_to_payment(9);

    channel.connect();
    settle().await;
    h.connector.latest().authenticate();
    settle().await;
    h.connector.latest().close();
    settle().await;

    helpers::advance(Duration::from_millis(3000)).await;
    let second = h.connector.server(1);
    assert!(second.received_of("subscribe").is_empty());
    second.authenticate();
    settle().await;
    assert_eq!(
        second.received_of("subscribe"),
        vec![json!({"type": "subscribe", "channel": "payment_9"})]
    );
    assert_eq!(h.connector.server(0).received_of("subscribe").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_keeps_subscriptions_and_cancels_retry() {
    let h = Harness::new();
    h.login(3600);
    h.connector.refuse.store(true, Ordering::SeqCst);
    let channel = h.channel();
    channel.subscribe_to_company(7);

    channel.connect();
    settle().await;
    assert_eq!(channel.status().reconnect_attempts, 1);

    channel.disconnect();
    helpers::advance(Duration::from_secs(60)).await;

    assert_eq!(h.connector.attempts(), 1);
    assert_eq!(channel.status().state, ConnectionState::Idle);
    assert_eq!(channel.subscriptions(), vec!["company_7"]);
}

// ── Send ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_send_requires_open_transport() {
    let h = Harness::new();
    h.login(3600);
    let channel = h.channel();
    let ping = json!({"type": "ping"});

    assert!(!channel.send(&ping));

    channel.connect();
    assert_eq!(channel.status().state, ConnectionState::Connecting { attempt: 0 });
    assert!(!channel.send(&ping));

    settle().await;
    assert!(channel.send(&ping));
    assert_eq!(h.connector.latest().received_of("ping"), vec![ping.clone()]);

    h.connector.latest().close();
    settle().await;
    assert!(!channel.send(&ping));

    channel.disconnect();
    assert!(!channel.send(&ping));
}

// ── Inbound events ───────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_failing_listener_does_not_block_siblings() {
    let h = Harness::new();
    h.login(3600);
    let channel = h.channel();
    channel.on("payment_received", |_| Err(AppError::internal("boom")));
    let seen = record(&channel, "payment_received");

    channel.connect();
    settle().await;
    let server = h.connector.latest();
    server.authenticate();
    server.push(json!({"type": "payment_received", "amount": 250}));
    settle().await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["amount"], 250);
    assert!(h.reporter.contexts().contains(&"realtime.emit".to_string()));
    assert!(channel.status().authenticated);
}

#[tokio::test(start_paused = true)]
async fn test_unauthorized_emits_authentication_failed() {
    let h = Harness::new();
    h.login(3600);
    let channel = h.channel();
    let failed = record(&channel, "authentication_failed");

    channel.connect();
    settle().await;
    let server = h.connector.latest();
    server.authenticate();
    settle().await;
    server.push(json!({"type": "error", "code": "UNAUTHORIZED", "message": "token revoked"}));
    settle().await;

    assert_eq!(failed.lock().unwrap()[0]["message"], "token revoked");
    let status = channel.status();
    assert!(status.connected);
    assert!(!status.authenticated);
    assert!(
        h.notifier
            .messages()
            .contains(&"Real-time authentication failed".to_string())
    );

    // Subscribing now only queues.
    channel.subscribe_to_user(1);
    assert!(server.received_of("subscribe").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_remote_error_codes_map_to_events() {
    let h = Harness::new();
    h.login(3600);
    let channel = h.channel();
    let tenant = record(&channel, "tenant_invalid");
    let error = record(&channel, "error");

    channel.connect();
    settle().await;
    let server = h.connector.latest();
    server.push(json!({"type": "error", "code": "INVALID_TENANT"}));
    server.push(json!({"type": "error", "code": "RATE_LIMITED"}));
    settle().await;

    assert_eq!(tenant.lock().unwrap().len(), 1);
    assert_eq!(error.lock().unwrap()[0]["code"], "RATE_LIMITED");
    assert!(channel.status().connected);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_frames_are_reported_and_skipped() {
    let h = Harness::new();
    h.login(3600);
    let channel = h.channel();
    let seen = record(&channel, "allocation_updated");

    channel.connect();
    settle().await;
    let server = h.connector.latest();
    server.push_raw("{not json");
    server.push(json!({"no_type": true}));
    server.push(json!({"type": "allocation_updated", "id": 3}));
    settle().await;

    assert_eq!(seen.lock().unwrap().len(), 1);
    let inbound = h
        .reporter
        .contexts()
        .into_iter()
        .filter(|c| c == "realtime.inbound")
        .count();
    assert_eq!(inbound, 2);
    assert!(channel.status().connected);
}

#[tokio::test(start_paused = true)]
async fn test_frames_from_replaced_transport_are_ignored() {
    let h = Harness::new();
    h.login(3600);
    let channel = h.channel();

    channel.connect();
    settle().await;
    let old = h.connector.latest();
    channel.disconnect();
    channel.connect();
    settle().await;

    let seen = record(&channel, "company_updated");
    old.push(json!({"type": "company_updated"}));
    old.close();
    settle().await;

    assert!(seen.lock().unwrap().is_empty());
    assert!(channel.status().connected);
    assert_eq!(h.connector.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_once_listener_and_unsubscribe() {
    let h = Harness::new();
    let channel = h.channel();
    let hits = Arc::new(Mutex::new(0));

    let counter = hits.clone();
    channel.once("ping", move |_| {
        *counter.lock().unwrap() += 1;
        Ok(())
    });
    let counter = hits.clone();
    let handle = channel.on("ping", move |_| {
        *counter.lock().unwrap() += 10;
        Ok(())
    });

    assert_eq!(channel.emit("ping", &Value::Null), 2);
    assert!(handle.unsubscribe());
    assert_eq!(channel.emit("ping", &Value::Null), 0);
    assert_eq!(*hits.lock().unwrap(), 11);
}
