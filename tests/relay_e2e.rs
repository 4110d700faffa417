//! End-to-end tests: a real listener driven by WebSocket and HTTP clients.

#![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_test::assert_ok;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use controller_relay::config::{RelayConfig, RoutingMode};
use controller_relay::server;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SECRET: &str = "s3cret";

struct Relay {
    addr: SocketAddr,
    _shutdown: oneshot::Sender<()>,
}

async fn start(routing_mode: RoutingMode) -> Relay {
    start_with(RelayConfig {
        shared_secret: Some(SECRET.to_string()),
        routing_mode,
        ..RelayConfig::default()
    })
    .await
}

async fn start_with(config: RelayConfig) -> Relay {
    let listener = assert_ok!(TcpListener::bind("127.0.0.1:0").await);
    let addr = assert_ok!(listener.local_addr());
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let shutdown = async {
            let _ = rx.await;
        };
        let _ = server::serve(listener, &config, shutdown).await;
    });
    Relay {
        addr,
        _shutdown: tx,
    }
}

async fn connect(relay: &Relay) -> Client {
    let (client, _) = assert_ok!(connect_async(format!("ws://{}/ws", relay.addr)).await);
    client
}

async fn connect_with_bearer(relay: &Relay, token: &str) -> Client {
    let mut request = assert_ok!(format!("ws://{}/ws", relay.addr).into_client_request());
    request.headers_mut().insert(
        AUTHORIZATION,
        assert_ok!(HeaderValue::from_str(&format!("Bearer {token}"))),
    );
    let (client, _) = assert_ok!(connect_async(request).await);
    client
}

/// Lets the server finish registering freshly upgraded sockets.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

async fn send_raw(client: &mut Client, text: &str) {
    assert_ok!(client.send(Message::text(text)).await);
}

async fn send(client: &mut Client, value: Value) {
    send_raw(client, &value.to_string()).await;
}

/// Next text frame as JSON, skipping control frames.
async fn recv_within(client: &mut Client, wait: Duration) -> Option<Value> {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        let next = tokio::time::timeout_at(deadline, client.next()).await.ok()??;
        match next.ok()? {
            Message::Text(text) => return serde_json::from_str(text.as_str()).ok(),
            Message::Close(_) => return None,
            _ => {}
        }
    }
}

async fn recv(client: &mut Client) -> Value {
    recv_within(client, Duration::from_secs(2))
        .await
        .unwrap_or_else(|| panic!("expected a message"))
}

async fn assert_silent(client: &mut Client) {
    let got = recv_within(client, Duration::from_millis(300)).await;
    assert!(got.is_none(), "unexpected message: {got:?}");
}

/// Keeps reading for `wait`, skipping everything but a close.
///
/// Returns `false` if the server closed the socket in that time.
async fn stays_open(client: &mut Client, wait: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        match tokio::time::timeout_at(deadline, client.next()).await {
            Err(_) => return true,
            Ok(None | Some(Err(_)) | Some(Ok(Message::Close(_)))) => return false,
            Ok(Some(Ok(_))) => {}
        }
    }
}

async fn health(relay: &Relay) -> Value {
    let response = assert_ok!(reqwest::get(format!("http://{}/health", relay.addr)).await);
    assert_eq!(response.status().as_u16(), 200);
    assert_ok!(response.json().await)
}

async fn identify(client: &mut Client, role: &str) {
    send(client, json!({ "type": "identify", "role": role })).await;
    assert_eq!(recv(client).await, json!({ "type": "identified", "role": role }));
}

#[tokio::test]
async fn vr_command_is_relayed_to_robot_only() {
    let relay = start(RoutingMode::Exclusive).await;
    let mut vr = connect(&relay).await;
    let mut robot = connect(&relay).await;
    let mut bystander = connect(&relay).await;
    identify(&mut vr, "vr").await;
    identify(&mut robot, "robot").await;

    send_raw(&mut vr, r#"{  "type": "vr_command", "move": [1, 0],  "meta": {"seq": 1} }"#).await;
    assert_eq!(
        recv(&mut robot).await,
        json!({ "type": "vr_command", "move": [1, 0], "meta": { "seq": 1 } })
    );

    send(&mut robot, json!({ "type": "robot_status", "battery": 90 })).await;
    assert_eq!(
        recv(&mut vr).await,
        json!({ "type": "robot_status", "battery": 90 })
    );

    assert_silent(&mut bystander).await;
}

#[tokio::test]
async fn malformed_and_unroutable_messages_keep_connection_open() {
    let relay = start(RoutingMode::Exclusive).await;
    let mut vr = connect(&relay).await;
    identify(&mut vr, "vr").await;

    send_raw(&mut vr, "definitely not json").await;
    send(&mut vr, json!({ "type": "vr_command", "cmd": "stop" })).await;
    assert_silent(&mut vr).await;

    // Still alive and served.
    identify(&mut vr, "vr").await;
}

#[tokio::test]
async fn second_vr_takes_over_without_closing_first() {
    let relay = start(RoutingMode::Exclusive).await;
    let mut first = connect(&relay).await;
    let mut second = connect(&relay).await;
    let mut robot = connect(&relay).await;
    identify(&mut first, "vr").await;
    identify(&mut second, "vr").await;
    identify(&mut robot, "robot").await;

    send(&mut robot, json!({ "type": "robot_status", "ok": true })).await;
    assert_eq!(recv(&mut second).await["ok"], json!(true));
    assert_silent(&mut first).await;

    // The displaced client is still connected.
    identify(&mut first, "vr").await;
}

#[tokio::test]
async fn disconnected_robot_frees_its_slot() {
    let relay = start(RoutingMode::Exclusive).await;
    let mut vr = connect(&relay).await;
    let mut robot = connect(&relay).await;
    identify(&mut vr, "vr").await;
    identify(&mut robot, "robot").await;
    assert_eq!(health(&relay).await["roles"], json!(["vr", "robot"]));
    assert_ok!(robot.close(None).await);
    drop(robot);
    settle().await;

    let after_close = health(&relay).await;
    assert_eq!(after_close["roles"], json!(["vr"]));
    assert_eq!(after_close["connections"], json!(1));

    let mut replacement = connect(&relay).await;
    identify(&mut replacement, "robot").await;
    send(&mut vr, json!({ "type": "vr_command", "n": 2 })).await;
    assert_eq!(recv(&mut replacement).await["n"], json!(2));
}

#[tokio::test]
async fn broadcast_from_publisher_skips_sender() {
    let relay = start(RoutingMode::Broadcast).await;
    let mut publisher = connect_with_bearer(&relay, SECRET).await;
    let mut a = connect(&relay).await;
    let mut b = connect(&relay).await;
    settle().await;

    send(
        &mut publisher,
        json!({ "timestamp": "1700000000000", "buttons": { "a": 1 }, "note": "hi" }),
    )
    .await;

    let expected = json!({
        "type": "xbox_input",
        "timestamp": 1_700_000_000_000_u64,
        "buttons": { "a": 1 },
        "note": "hi"
    });
    assert_eq!(recv(&mut a).await, expected);
    assert_eq!(recv(&mut b).await, expected);
    assert_silent(&mut publisher).await;
}

#[tokio::test]
async fn wrong_upgrade_credential_is_not_a_publisher() {
    let relay = start(RoutingMode::Broadcast).await;
    let mut client = connect_with_bearer(&relay, "wrong").await;
    let mut other = connect(&relay).await;

    send(&mut client, json!({ "timestamp": 1 })).await;
    assert_eq!(recv(&mut client).await, json!({ "error": "unauthorized" }));
    assert_silent(&mut other).await;
}

#[tokio::test]
async fn inband_auth_then_broadcast() {
    let relay = start(RoutingMode::Broadcast).await;
    let mut client = connect(&relay).await;
    let mut other = connect(&relay).await;
    settle().await;

    send(&mut client, json!({ "action": "auth", "token": "nope" })).await;
    assert_eq!(recv(&mut client).await, json!({ "type": "auth_failed" }));

    send(&mut client, json!({ "action": "auth", "token": SECRET })).await;
    assert_eq!(recv(&mut client).await, json!({ "type": "auth_ok" }));

    send(&mut client, json!({ "type": "custom", "timestamp": 3 })).await;
    assert_eq!(
        recv(&mut other).await,
        json!({ "type": "custom", "timestamp": 3 })
    );
}

#[tokio::test]
async fn http_publish_reaches_socket_clients() {
    let relay = start(RoutingMode::Broadcast).await;
    let mut listener = connect(&relay).await;
    settle().await;

    let http = reqwest::Client::new();
    let url = format!("http://{}/publish", relay.addr);

    let unauthorized = assert_ok!(http.post(&url).json(&json!({ "timestamp": 1 })).send().await);
    assert_eq!(unauthorized.status().as_u16(), 401);

    let invalid = assert_ok!(
        http.post(&url)
            .bearer_auth(SECRET)
            .json(&json!({ "axes": { "x": "left" }, "timestamp": 1 }))
            .send()
            .await
    );
    assert_eq!(invalid.status().as_u16(), 400);
    let body: Value = assert_ok!(invalid.json().await);
    assert_eq!(body["details"], json!("axes.x: expected number"));

    let accepted = assert_ok!(
        http.post(&url)
            .bearer_auth(SECRET)
            .json(&json!({ "timestamp": 5, "controller_id": 2, "extra": [true] }))
            .send()
            .await
    );
    assert_eq!(accepted.status().as_u16(), 202);
    let body: Value = assert_ok!(accepted.json().await);
    assert_eq!(body["status"], json!("forwarded"));

    assert_eq!(
        recv(&mut listener).await,
        json!({ "type": "xbox_input", "timestamp": 5, "controller_id": 2, "extra": [true] })
    );
}

#[tokio::test]
async fn ping_endpoint_answers_pong() {
    let relay = start(RoutingMode::Exclusive).await;
    let response = assert_ok!(reqwest::get(format!("http://{}/ping", relay.addr)).await);
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(assert_ok!(response.text().await), "pong");
}

fn fast_heartbeat() -> RelayConfig {
    RelayConfig {
        heartbeat_interval: Duration::from_secs(1),
        ..RelayConfig::default()
    }
}

#[tokio::test]
async fn responsive_client_survives_liveness_sweeps() {
    let relay = start_with(fast_heartbeat()).await;
    let mut vr = connect(&relay).await;
    let mut robot = connect(&relay).await;
    identify(&mut vr, "vr").await;
    identify(&mut robot, "robot").await;

    // Reading lets the client answer each ping with a pong.
    let (vr_open, robot_open) = tokio::join!(
        stays_open(&mut vr, Duration::from_millis(3500)),
        stays_open(&mut robot, Duration::from_millis(3500)),
    );
    assert!(vr_open);
    assert!(robot_open);

    send(&mut vr, json!({ "type": "vr_command", "after": "sweeps" })).await;
    assert_eq!(recv(&mut robot).await["after"], json!("sweeps"));
}

#[tokio::test]
async fn silent_client_is_closed_and_loses_its_role() {
    let relay = start_with(fast_heartbeat()).await;
    let mut vr = connect(&relay).await;
    let mut robot = connect(&relay).await;
    identify(&mut vr, "vr").await;
    identify(&mut robot, "robot").await;

    // The robot stops reading, so pings go unanswered.
    let vr_open = stays_open(&mut vr, Duration::from_millis(3500)).await;
    assert!(vr_open);

    let snapshot = health(&relay).await;
    assert_eq!(snapshot["roles"], json!(["vr"]));
    assert_eq!(snapshot["connections"], json!(1));
    assert!(!stays_open(&mut robot, Duration::from_secs(2)).await);
}
