//! In-memory storage backend (no persistence)
//!
//! This backend keeps agents and samples in maps behind an `RwLock`.
//! It's useful for:
//! - Testing without database dependencies
//! - Deployments that don't care about losing history on restart
//!
//! It enforces the same passphrase uniqueness contract as the SQLite
//! backend so the registry's conflict handling behaves identically.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{HealthStatus, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::schema::{AgentRow, NewAgent, SampleRow};
use crate::AgentStatus;

/// In-memory storage backend
pub struct MemoryBackend {
    /// Agent rows keyed by database id
    agents: RwLock<HashMap<i64, AgentRow>>,

    /// All samples, append order
    samples: RwLock<Vec<SampleRow>>,

    /// Next agent id to assign
    next_id: AtomicI64,
}

impl MemoryBackend {
    /// Create a new in-memory backend
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            samples: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn insert_agent(&self, agent: NewAgent) -> StorageResult<AgentRow> {
        let mut agents = self.agents.write().await;

        if agents.values().any(|a| a.passphrase == agent.passphrase) {
            return Err(StorageError::Duplicate(format!(
                "passphrase already registered for host {}",
                agent.hostname
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let row = agent.into_row(id, Utc::now());
        agents.insert(id, row.clone());

        debug!("inserted agent {} ({})", id, row.hostname);
        Ok(row)
    }

    async fn find_agent_by_passphrase(&self, passphrase: &str) -> StorageResult<Option<AgentRow>> {
        let agents = self.agents.read().await;
        Ok(agents
            .values()
            .find(|a| a.passphrase == passphrase)
            .cloned())
    }

    async fn find_agent_by_id(&self, id: i64) -> StorageResult<Option<AgentRow>> {
        let agents = self.agents.read().await;
        Ok(agents.get(&id).cloned())
    }

    async fn update_agent(&self, agent: &AgentRow) -> StorageResult<()> {
        let mut agents = self.agents.write().await;
        match agents.get_mut(&agent.id) {
            Some(existing) => {
                *existing = agent.clone();
                Ok(())
            }
            None => Err(StorageError::QueryFailed(format!(
                "agent {} does not exist",
                agent.id
            ))),
        }
    }

    async fn find_agents_by_status(&self, status: AgentStatus) -> StorageResult<Vec<AgentRow>> {
        let agents = self.agents.read().await;
        let mut matching: Vec<AgentRow> = agents
            .values()
            .filter(|a| a.status == status)
            .cloned()
            .collect();
        matching.sort_by_key(|a| a.id);
        Ok(matching)
    }

    async fn insert_sample(&self, sample: &SampleRow) -> StorageResult<()> {
        let mut samples = self.samples.write().await;
        samples.push(sample.clone());
        Ok(())
    }

    async fn query_samples(
        &self,
        agent_id: &str,
        target: &str,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<SampleRow>> {
        let samples = self.samples.read().await;
        let mut matching: Vec<SampleRow> = samples
            .iter()
            .filter(|s| s.agent_id == agent_id && s.target == target && s.timestamp >= since)
            .cloned()
            .collect();
        matching.sort_by_key(|s| s.timestamp);
        Ok(matching)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let agents = self.agents.read().await;
        Ok(HealthStatus {
            healthy: true,
            message: format!("In-memory storage operational ({} agents)", agents.len()),
        })
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory backend (no-op)");
        Ok(())
    }
}
