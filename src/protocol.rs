//! Message types for the agent channel
//!
//! Every frame on the per-agent WebSocket is a JSON object tagged by an
//! `"event"` field. The catalog mirrors both directions of the channel:
//! agents send `handshake` and `monitoring_data`, the hub answers with
//! `welcome`, `registration_status`, `server_message` and `data_received`.
//!
//! Batch entries keep `timestamp` and `result` as raw strings: a single
//! malformed entry must fail validation in the ingestion pipeline, not
//! poison deserialization of the whole batch.

use serde::{Deserialize, Serialize};

use crate::AgentStatus;

/// One entry of a `monitoring_data` batch, as submitted by an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleEntry {
    /// Probed address
    pub target: String,

    /// Caller-supplied measurement time (ISO 8601, validated later)
    pub timestamp: String,

    /// "ok" or "fail" (validated later)
    pub result: String,

    /// Round-trip time on success; ignored and zeroed on failure
    #[serde(default)]
    pub latency: Option<f64>,
}

/// Messages an agent sends to the hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentMessage {
    /// Initial identity message, sent on every (re)connection
    Handshake {
        passphrase: String,
        hostname: String,
        ip_address: String,
        version: String,
    },

    /// Periodic batch of probe samples
    MonitoringData {
        agent_id: String,
        data: Vec<SampleEntry>,
    },
}

/// Push payloads carried inside a `server_message` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerPush {
    /// The complete current target set; agents replace, never merge
    UpdateTargets { targets: Vec<String> },
}

/// Messages the hub sends to an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Greeting sent right after the connection is established
    Welcome { message: String },

    /// Handshake response carrying the agent's current status
    RegistrationStatus {
        status: AgentStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        agent_id: Option<String>,
        message: String,
    },

    /// Typed push notification (target set updates)
    ServerMessage {
        #[serde(flatten)]
        push: ServerPush,
    },

    /// Acknowledgment for a monitoring_data batch
    DataReceived { message: String },
}

impl ServerEvent {
    /// Shorthand for a full target-set push.
    pub fn update_targets(targets: Vec<String>) -> Self {
        ServerEvent::ServerMessage {
            push: ServerPush::UpdateTargets { targets },
        }
    }
}
