//! Storage backend trait definition
//!
//! This module defines the core `StorageBackend` trait that all
//! storage implementations must implement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::StorageResult;
use super::schema::{AgentRow, NewAgent, SampleRow};
use crate::AgentStatus;

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,
}

/// Trait for persistent storage backends
///
/// The contract is deliberately small: the hub needs agent identity CRUD
/// plus append-and-range-scan over samples. Implementations must be
/// `Send + Sync` as they are shared across async tasks behind an `Arc`.
///
/// ## Error Handling
///
/// Methods return `StorageResult<T>` which wraps `StorageError`.
/// `insert_agent` must surface unique-constraint violations as
/// `StorageError::Duplicate` so the registry can resolve concurrent
/// handshakes bearing the same passphrase deterministically.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Insert a new agent row and return it with its assigned id.
    ///
    /// Fails with `StorageError::Duplicate` when the passphrase is already
    /// registered.
    async fn insert_agent(&self, agent: NewAgent) -> StorageResult<AgentRow>;

    /// Look up an agent by its reconnection passphrase.
    async fn find_agent_by_passphrase(&self, passphrase: &str) -> StorageResult<Option<AgentRow>>;

    /// Look up an agent by its database id.
    async fn find_agent_by_id(&self, id: i64) -> StorageResult<Option<AgentRow>>;

    /// Persist the mutable fields of an existing agent row.
    async fn update_agent(&self, agent: &AgentRow) -> StorageResult<()>;

    /// List all agents currently in the given status, ordered by id.
    async fn find_agents_by_status(&self, status: AgentStatus) -> StorageResult<Vec<AgentRow>>;

    /// Append one probe sample.
    async fn insert_sample(&self, sample: &SampleRow) -> StorageResult<()>;

    /// Samples for one (agent, target) pair at or after `since`,
    /// ordered by timestamp (oldest first).
    async fn query_samples(
        &self,
        agent_id: &str,
        target: &str,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<SampleRow>>;

    /// Check backend health
    ///
    /// Performs a lightweight operation to verify the backend
    /// is operational (e.g., ping database, check file access).
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Close the backend and release resources
    async fn close(&self) -> StorageResult<()>;
}
