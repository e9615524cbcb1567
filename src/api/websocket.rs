//! WebSocket handler for the agent channel
//!
//! Each connected agent gets one bidirectional channel: inbound frames are
//! dispatched into the registry and ingestion pipeline, outbound events
//! flow through an mpsc channel owned by the broadcast gateway so that
//! fleet-wide pushes and per-connection replies share one ordered stream.

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, stream::StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::AgentStatus;
use crate::api::state::ApiState;
use crate::protocol::{AgentMessage, ServerEvent};
use crate::registry::HandshakeRequest;

/// WebSocket upgrade handler
///
/// GET /agent
pub async fn agent_socket_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    ws.on_upgrade(|socket| handle_agent_socket(socket, state))
}

/// Handle one agent connection for its lifetime
async fn handle_agent_socket(socket: WebSocket, state: ApiState) {
    info!("agent channel connected");

    let (mut sender, mut receiver) = socket.split();

    let (event_tx, mut event_rx) = mpsc::channel::<ServerEvent>(32);
    let conn_id = state.gateway.register(event_tx).await;

    state
        .gateway
        .send_to(
            conn_id,
            ServerEvent::Welcome {
                message: "Connected to meshping hub".to_string(),
            },
        )
        .await;

    // Forward queued events (replies and fleet-wide pushes) to the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!("failed to serialize server event: {e}");
                    continue;
                }
            };

            if sender.send(Message::Text(text)).await.is_err() {
                debug!("WebSocket send failed, agent disconnected");
                break;
            }
        }
    });

    // Dispatch incoming frames into the components.
    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    dispatch_agent_message(&recv_state, conn_id, &text).await;
                }
                Message::Close(_) => break,
                _ => {
                    // Ping/pong handled by axum, binary frames ignored
                }
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    state.gateway.unregister(conn_id).await;
    info!("agent channel disconnected");
}

/// Dispatch one parsed frame from an agent
async fn dispatch_agent_message(state: &ApiState, conn_id: u64, text: &str) {
    let message = match serde_json::from_str::<AgentMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            debug!("ignoring unparsable agent frame: {e}");
            return;
        }
    };

    match message {
        AgentMessage::Handshake {
            passphrase,
            hostname,
            ip_address,
            version,
        } => {
            let request = HandshakeRequest {
                passphrase,
                hostname,
                ip_address,
                version,
            };

            let outcome = match state.registry.handshake(request).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("handshake failed: {e}");
                    return;
                }
            };

            let approved = outcome.status == AgentStatus::Approved;
            state.gateway.set_approved(conn_id, approved).await;

            state
                .gateway
                .push_status_notice(
                    conn_id,
                    outcome.status,
                    outcome.agent_id,
                    outcome.message,
                )
                .await;

            // Approved agents always get the full current set on
            // handshake, which makes missed broadcasts harmless.
            if approved {
                let targets = state.targets.get().await;
                state
                    .gateway
                    .send_to(conn_id, ServerEvent::update_targets(targets))
                    .await;
            }
        }

        AgentMessage::MonitoringData { agent_id, data } => {
            match state.ingest.ingest(&agent_id, &data).await {
                Ok(report) => {
                    state
                        .gateway
                        .send_to(
                            conn_id,
                            ServerEvent::DataReceived {
                                message: format!(
                                    "Stored {} samples ({} rejected)",
                                    report.accepted, report.rejected
                                ),
                            },
                        )
                        .await;
                }
                Err(e) => {
                    // No error frame exists on this channel; the agent
                    // resends on its next interval.
                    error!("failed to persist batch from {agent_id}: {e}");
                }
            }
        }
    }
}
