//! Broadcast gateway for connected agent channels
//!
//! Every agent WebSocket connection registers an outbound mpsc channel
//! here. The gateway is the single place that knows which channels exist
//! and which of them belong to approved agents, so target-set updates can
//! be fanned out without the HTTP handlers touching connection state.
//!
//! Delivery is best-effort: each per-channel send is bounded by a short
//! timeout and dropped on expiry, so a slow or dead agent can never stall
//! the administrative action that triggered the push. A disconnected agent
//! simply misses the update and receives the full current set again on its
//! next handshake.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{RwLock, mpsc};
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::AgentStatus;
use crate::protocol::ServerEvent;

struct AgentChannel {
    sender: mpsc::Sender<ServerEvent>,
    approved: bool,
}

/// Registry of connected agent channels
pub struct BroadcastGateway {
    channels: RwLock<HashMap<u64, AgentChannel>>,
    next_id: AtomicU64,
    send_timeout: Duration,
}

impl BroadcastGateway {
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            send_timeout,
        }
    }

    /// Register a freshly connected channel and return its connection id.
    ///
    /// Channels start out unapproved; the handshake flow flips the flag
    /// once the registry has resolved the agent's status.
    pub async fn register(&self, sender: mpsc::Sender<ServerEvent>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut channels = self.channels.write().await;
        channels.insert(
            id,
            AgentChannel {
                sender,
                approved: false,
            },
        );
        debug!("registered agent channel {}", id);
        id
    }

    pub async fn set_approved(&self, id: u64, approved: bool) {
        let mut channels = self.channels.write().await;
        if let Some(channel) = channels.get_mut(&id) {
            channel.approved = approved;
        }
    }

    pub async fn unregister(&self, id: u64) {
        let mut channels = self.channels.write().await;
        channels.remove(&id);
        debug!("unregistered agent channel {}", id);
    }

    /// Number of currently connected channels.
    pub async fn connected(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Unicast one event, bounded by the send timeout.
    ///
    /// Returns false when the channel is gone, full past the timeout, or
    /// closed; the caller is not expected to react beyond logging.
    pub async fn send_to(&self, id: u64, event: ServerEvent) -> bool {
        let sender = {
            let channels = self.channels.read().await;
            match channels.get(&id) {
                Some(channel) => channel.sender.clone(),
                None => return false,
            }
        };

        match timeout(self.send_timeout, sender.send(event)).await {
            Ok(Ok(())) => true,
            Ok(Err(_)) => {
                trace!("channel {} closed, dropping event", id);
                false
            }
            Err(_) => {
                debug!("send to channel {} timed out, dropping event", id);
                false
            }
        }
    }

    /// Unicast a `registration_status` notice during handshake.
    pub async fn push_status_notice(
        &self,
        id: u64,
        status: AgentStatus,
        agent_id: Option<String>,
        message: String,
    ) -> bool {
        self.send_to(
            id,
            ServerEvent::RegistrationStatus {
                status,
                agent_id,
                message,
            },
        )
        .await
    }

    /// Push the complete target set to every connected, approved channel.
    ///
    /// Sends run concurrently, so the total wall time is bounded by the
    /// single per-channel timeout regardless of fleet size.
    pub async fn push_target_update(&self, targets: Vec<String>) {
        let recipients: Vec<(u64, mpsc::Sender<ServerEvent>)> = {
            let channels = self.channels.read().await;
            channels
                .iter()
                .filter(|(_, channel)| channel.approved)
                .map(|(id, channel)| (*id, channel.sender.clone()))
                .collect()
        };

        if recipients.is_empty() {
            trace!("no approved channels connected, skipping target push");
            return;
        }

        let send_timeout = self.send_timeout;
        let sends = recipients.into_iter().map(|(id, sender)| {
            let event = ServerEvent::update_targets(targets.clone());
            async move {
                match timeout(send_timeout, sender.send(event)).await {
                    Ok(Ok(())) => true,
                    Ok(Err(_)) => {
                        trace!("channel {} closed during target push", id);
                        false
                    }
                    Err(_) => {
                        debug!("target push to channel {} timed out", id);
                        false
                    }
                }
            }
        });

        let delivered = join_all(sends).await.into_iter().filter(|ok| *ok).count();
        debug!("target update delivered to {} channels", delivered);
    }
}
