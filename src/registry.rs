//! Agent registry
//!
//! Owns agent identity and the lifecycle state machine:
//!
//! ```text
//!   (first handshake) ──► pending ──approve──► approved
//!                            │                    │
//!                          reject          address change
//!                            │                    │
//!                            ▼                    ▼
//!                       blacklisted ◄──reject── hold ──approve──► approved
//! ```
//!
//! Blacklisting is terminal: an explicit reinstate operation would be
//! needed to bring such an agent back, and none exists.
//!
//! Status transitions for one agent are serialized through a per-agent
//! lock map; the row is re-read under the lock before every transition so
//! a handshake retry cannot race an approval into a lost update. Distinct
//! agents never contend. Creation races on the same passphrase are settled
//! by the store's unique constraint: the loser of the race retries its
//! insert as a lookup.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::AgentStatus;
use crate::storage::{NewAgent, StorageBackend, StorageError};

/// Result type alias for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors surfaced by registry operations
#[derive(Debug)]
pub enum RegistryError {
    /// No agent with the given database id
    NotFound,

    /// The agent is blacklisted and the requested transition is forbidden
    Blacklisted,

    /// The durable store failed
    Storage(StorageError),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::NotFound => write!(f, "agent not found"),
            RegistryError::Blacklisted => write!(f, "agent is blacklisted"),
            RegistryError::Storage(err) => write!(f, "registry storage error: {}", err),
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistryError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for RegistryError {
    fn from(err: StorageError) -> Self {
        RegistryError::Storage(err)
    }
}

/// Identity fields an agent submits with its handshake.
#[derive(Debug, Clone)]
pub struct HandshakeRequest {
    pub passphrase: String,
    pub hostname: String,
    pub ip_address: String,
    pub version: String,
}

/// What the handshake resolved to, sent back as `registration_status`.
#[derive(Debug, Clone)]
pub struct HandshakeOutcome {
    pub status: AgentStatus,
    pub agent_id: Option<String>,
    pub message: String,
}

/// Agent identity and lifecycle component
pub struct AgentRegistry {
    storage: Arc<dyn StorageBackend>,
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl AgentRegistry {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            locks: DashMap::new(),
        }
    }

    fn agent_lock(&self, id: i64) -> Arc<Mutex<()>> {
        self.locks.entry(id).or_default().clone()
    }

    /// Resolve an agent handshake.
    ///
    /// Unknown passphrases create a new `pending` agent. Known agents get
    /// a no-op reconnection ack, except approved agents reporting a new
    /// address, which drop to `hold` until re-approved.
    pub async fn handshake(&self, request: HandshakeRequest) -> RegistryResult<HandshakeOutcome> {
        let existing = self
            .storage
            .find_agent_by_passphrase(&request.passphrase)
            .await?;

        let resolved = match existing {
            Some(agent) => agent,
            None => {
                let new_agent = NewAgent {
                    hostname: request.hostname.clone(),
                    ip_address: request.ip_address.clone(),
                    version: request.version.clone(),
                    passphrase: request.passphrase.clone(),
                };

                match self.storage.insert_agent(new_agent).await {
                    Ok(agent) => {
                        info!("registered new agent {} ({})", agent.id, agent.hostname);
                        return Ok(HandshakeOutcome {
                            status: AgentStatus::Pending,
                            agent_id: None,
                            message: "Provisional registration complete. Awaiting administrator approval.".to_string(),
                        });
                    }
                    // Lost a creation race on this passphrase; the row
                    // exists now, continue as a reconnection.
                    Err(StorageError::Duplicate(_)) => self
                        .storage
                        .find_agent_by_passphrase(&request.passphrase)
                        .await?
                        .ok_or(RegistryError::NotFound)?,
                    Err(err) => return Err(err.into()),
                }
            }
        };

        let lock = self.agent_lock(resolved.id);
        let _guard = lock.lock().await;

        let mut agent = self
            .storage
            .find_agent_by_id(resolved.id)
            .await?
            .ok_or(RegistryError::NotFound)?;

        if agent.status == AgentStatus::Approved && agent.ip_address != request.ip_address {
            agent.status = AgentStatus::Hold;
            agent.updated_at = Utc::now();
            self.storage.update_agent(&agent).await?;

            info!(
                "agent {} reconnected from {} (was {}), moved to hold",
                agent.id, request.ip_address, agent.ip_address
            );

            return Ok(HandshakeOutcome {
                status: AgentStatus::Hold,
                agent_id: agent.agent_id,
                message: "Address changed: re-approval required.".to_string(),
            });
        }

        debug!("agent {} reconnected with status {}", agent.id, agent.status);
        Ok(HandshakeOutcome {
            status: agent.status,
            agent_id: agent.agent_id,
            message: "Reconnected.".to_string(),
        })
    }

    /// Approve an agent, assigning its public id on first approval.
    ///
    /// The public id is derived from the database id and never changes
    /// across repeated approvals. Blacklisted agents cannot be approved.
    /// The row is committed before this returns; the caller follows up
    /// with the target-set re-sync broadcast.
    pub async fn approve(&self, id: i64) -> RegistryResult<String> {
        let lock = self.agent_lock(id);
        let _guard = lock.lock().await;

        let mut agent = self
            .storage
            .find_agent_by_id(id)
            .await?
            .ok_or(RegistryError::NotFound)?;

        if agent.status == AgentStatus::Blacklisted {
            return Err(RegistryError::Blacklisted);
        }

        agent.status = AgentStatus::Approved;
        let public_id = agent
            .agent_id
            .get_or_insert(format!("agent_{}", agent.id))
            .clone();
        agent.updated_at = Utc::now();

        self.storage.update_agent(&agent).await?;

        info!("approved agent {} as {}", agent.id, public_id);
        Ok(public_id)
    }

    /// Permanently blacklist an agent.
    pub async fn reject(&self, id: i64) -> RegistryResult<()> {
        let lock = self.agent_lock(id);
        let _guard = lock.lock().await;

        let mut agent = self
            .storage
            .find_agent_by_id(id)
            .await?
            .ok_or(RegistryError::NotFound)?;

        agent.status = AgentStatus::Blacklisted;
        agent.updated_at = Utc::now();

        self.storage.update_agent(&agent).await?;

        info!("rejected and blacklisted agent {}", agent.id);
        Ok(())
    }
}
