//! Row definitions for the durable store
//!
//! Two tables back the hub: `agents` (identity and lifecycle status) and
//! `samples` (probe measurements, keyed by the agent's public id).
//! Timestamps are stored as Unix milliseconds; the enum columns round-trip
//! through their `Display`/`FromStr` forms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AgentStatus, ProbeResult};

/// A persisted agent identity row.
///
/// `id` is the database key administrators act on; `agent_id` is the public
/// identifier assigned exactly once at first approval and immutable
/// afterwards. The passphrase is the bearer credential agents reconnect
/// with and is unique across rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRow {
    pub id: i64,
    pub agent_id: Option<String>,
    pub hostname: String,
    pub ip_address: String,
    pub version: String,
    pub passphrase: String,
    pub status: AgentStatus,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertion payload for a first-time handshake.
#[derive(Debug, Clone)]
pub struct NewAgent {
    pub hostname: String,
    pub ip_address: String,
    pub version: String,
    pub passphrase: String,
}

impl NewAgent {
    /// Materialize a full row once the store has assigned an id.
    ///
    /// New agents always start in `pending` status with no public id.
    pub fn into_row(self, id: i64, now: DateTime<Utc>) -> AgentRow {
        AgentRow {
            id,
            agent_id: None,
            hostname: self.hostname,
            ip_address: self.ip_address,
            version: self.version,
            passphrase: self.passphrase,
            status: AgentStatus::Pending,
            registered_at: now,
            updated_at: now,
        }
    }
}

/// One probe measurement, immutable once created.
///
/// `latency` is meaningful only when `result` is `ok`; the ingestion
/// pipeline zeroes it otherwise, whatever the agent sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRow {
    pub agent_id: String,
    pub target: String,
    pub timestamp: DateTime<Utc>,
    pub result: ProbeResult,
    pub latency: f64,
}
