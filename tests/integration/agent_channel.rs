//! End-to-end agent channel tests over a real WebSocket

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};

use crate::helpers::spawn_test_hub;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect_agent(addr: SocketAddr) -> WsStream {
    let (stream, _) = connect_async(format!("ws://{}/agent", addr))
        .await
        .expect("failed to connect agent channel");
    stream
}

async fn next_json(stream: &mut WsStream) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("timed out waiting for server event")
        .expect("stream ended")
        .expect("websocket error");

    match msg {
        Message::Text(text) => serde_json::from_str(&text).expect("invalid JSON frame"),
        other => panic!("unexpected frame: {other:?}"),
    }
}

async fn send_json(stream: &mut WsStream, value: Value) {
    stream
        .send(Message::Text(value.to_string()))
        .await
        .expect("failed to send frame");
}

fn handshake_frame(passphrase: &str) -> Value {
    json!({
        "event": "handshake",
        "passphrase": passphrase,
        "hostname": "probe-01",
        "ip_address": "192.0.2.10",
        "version": "1.0.0",
    })
}

#[tokio::test]
async fn test_connection_is_welcomed() {
    let (addr, _hub) = spawn_test_hub().await;
    let mut agent = connect_agent(addr).await;

    let welcome = next_json(&mut agent).await;
    assert_eq!(welcome["event"], "welcome");
}

#[tokio::test]
async fn test_first_handshake_reports_pending() {
    let (addr, _hub) = spawn_test_hub().await;
    let mut agent = connect_agent(addr).await;
    next_json(&mut agent).await; // welcome

    send_json(&mut agent, handshake_frame("p1")).await;

    let status = next_json(&mut agent).await;
    assert_eq!(status["event"], "registration_status");
    assert_eq!(status["status"], "pending");
    assert!(status.get("agent_id").is_none());
}

#[tokio::test]
async fn test_approved_handshake_receives_target_set() {
    let (addr, _hub) = spawn_test_hub().await;
    let client = reqwest::Client::new();

    // Seed the target set before the agent is approved.
    client
        .post(format!("http://{}/admin/update_targets", addr))
        .json(&json!({"targets": ["10.0.0.1", "10.0.0.2"]}))
        .send()
        .await
        .unwrap();

    let mut agent = connect_agent(addr).await;
    next_json(&mut agent).await; // welcome

    send_json(&mut agent, handshake_frame("p1")).await;
    next_json(&mut agent).await; // pending status

    client
        .post(format!("http://{}/admin/approve/1", addr))
        .send()
        .await
        .unwrap();

    // The channel was not yet approved at push time, so the agent picks
    // the set up by re-handshaking.
    send_json(&mut agent, handshake_frame("p1")).await;

    let status = next_json(&mut agent).await;
    assert_eq!(status["event"], "registration_status");
    assert_eq!(status["status"], "approved");
    assert_eq!(status["agent_id"], "agent_1");

    let push = next_json(&mut agent).await;
    assert_eq!(push["event"], "server_message");
    assert_eq!(push["type"], "update_targets");
    assert_eq!(push["targets"], json!(["10.0.0.1", "10.0.0.2"]));
}

#[tokio::test]
async fn test_target_replacement_is_pushed_to_approved_channel() {
    let (addr, _hub) = spawn_test_hub().await;
    let client = reqwest::Client::new();

    let mut agent = connect_agent(addr).await;
    next_json(&mut agent).await; // welcome
    send_json(&mut agent, handshake_frame("p1")).await;
    next_json(&mut agent).await; // pending

    client
        .post(format!("http://{}/admin/approve/1", addr))
        .send()
        .await
        .unwrap();

    // Re-handshake marks this channel approved.
    send_json(&mut agent, handshake_frame("p1")).await;
    next_json(&mut agent).await; // approved status
    next_json(&mut agent).await; // initial (empty) target push

    client
        .post(format!("http://{}/admin/update_targets", addr))
        .json(&json!({"targets": ["203.0.113.9"]}))
        .send()
        .await
        .unwrap();

    let push = next_json(&mut agent).await;
    assert_eq!(push["event"], "server_message");
    assert_eq!(push["type"], "update_targets");
    assert_eq!(push["targets"], json!(["203.0.113.9"]));
}

#[tokio::test]
async fn test_monitoring_data_is_acked_and_queryable() {
    let (addr, _hub) = spawn_test_hub().await;
    let client = reqwest::Client::new();

    let mut agent = connect_agent(addr).await;
    next_json(&mut agent).await; // welcome
    send_json(&mut agent, handshake_frame("p1")).await;
    next_json(&mut agent).await; // pending

    client
        .post(format!("http://{}/admin/approve/1", addr))
        .send()
        .await
        .unwrap();

    send_json(
        &mut agent,
        json!({
            "event": "monitoring_data",
            "agent_id": "agent_1",
            "data": [
                {
                    "target": "8.8.8.8",
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                    "result": "ok",
                    "latency": 12.3,
                },
                {
                    "target": "8.8.8.8",
                    "timestamp": "garbage",
                    "result": "ok",
                    "latency": 1.0,
                },
            ],
        }),
    )
    .await;

    let ack = next_json(&mut agent).await;
    assert_eq!(ack["event"], "data_received");
    let message = ack["message"].as_str().unwrap();
    assert!(message.contains("1 samples"), "message: {message}");
    assert!(message.contains("1 rejected"), "message: {message}");

    let response = client
        .get(format!("http://{}/monitoring/agent_1/8.8.8.8", addr))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    let points = body.as_array().unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["latency"], 12.3);
}
