//! SQLite storage backend implementation
//!
//! This module provides a SQLite-based implementation of the `StorageBackend`
//! trait.
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Better concurrency for reads during writes
//! - **Connection pooling**: Efficient resource usage
//! - **Migrations**: Automatic schema versioning with sqlx
//!
//! ## Limitations
//!
//! - **Concurrency**: Limited concurrent writes (fine for small fleets)
//! - **Distributed**: Single-machine only

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument, warn};

use super::backend::{HealthStatus, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::schema::{AgentRow, NewAgent, SampleRow};
use crate::{AgentStatus, ProbeResult};

/// SQLite storage backend
///
/// Stores agent identities and probe samples in a local database file.
pub struct SqliteBackend {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteBackend {
    /// Create a new SQLite backend
    ///
    /// This will:
    /// 1. Create the database file if it doesn't exist
    /// 2. Run migrations to create tables
    /// 3. Configure SQLite for optimal performance (WAL mode, etc.)
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite backend at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

        info!("database migrations complete");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    /// Helper to convert timestamp to Unix milliseconds for SQLite
    fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }

    /// Helper to convert Unix milliseconds from SQLite to DateTime
    fn millis_to_timestamp(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }

    fn agent_from_row(row: &SqliteRow) -> StorageResult<AgentRow> {
        let status_str: String = row.get("status");
        let status = AgentStatus::from_str(&status_str)
            .map_err(StorageError::SerializationError)?;

        Ok(AgentRow {
            id: row.get("id"),
            agent_id: row.get("agent_id"),
            hostname: row.get("hostname"),
            ip_address: row.get("ip_address"),
            version: row.get("version"),
            passphrase: row.get("passphrase"),
            status,
            registered_at: Self::millis_to_timestamp(row.get("registered_at")),
            updated_at: Self::millis_to_timestamp(row.get("updated_at")),
        })
    }

    fn sample_from_row(row: &SqliteRow) -> StorageResult<SampleRow> {
        let result_str: String = row.get("result");
        let result = ProbeResult::from_str(&result_str)
            .map_err(StorageError::SerializationError)?;

        Ok(SampleRow {
            agent_id: row.get("agent_id"),
            target: row.get("target"),
            timestamp: Self::millis_to_timestamp(row.get("timestamp")),
            result,
            latency: row.get("latency"),
        })
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    #[instrument(skip(self, agent), fields(hostname = %agent.hostname))]
    async fn insert_agent(&self, agent: NewAgent) -> StorageResult<AgentRow> {
        let now = Utc::now();
        let now_millis = Self::timestamp_to_millis(&now);

        let result = sqlx::query(
            r#"
            INSERT INTO agents (hostname, ip_address, version, passphrase, status, registered_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&agent.hostname)
        .bind(&agent.ip_address)
        .bind(&agent.version)
        .bind(&agent.passphrase)
        .bind(AgentStatus::Pending.to_string())
        .bind(now_millis)
        .bind(now_millis)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!("inserted agent {} ({})", id, agent.hostname);

        Ok(agent.into_row(id, now))
    }

    #[instrument(skip(self, passphrase))]
    async fn find_agent_by_passphrase(&self, passphrase: &str) -> StorageResult<Option<AgentRow>> {
        let row = sqlx::query("SELECT * FROM agents WHERE passphrase = ?")
            .bind(passphrase)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::agent_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn find_agent_by_id(&self, id: i64) -> StorageResult<Option<AgentRow>> {
        let row = sqlx::query("SELECT * FROM agents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::agent_from_row).transpose()
    }

    #[instrument(skip(self, agent), fields(id = agent.id))]
    async fn update_agent(&self, agent: &AgentRow) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE agents
            SET agent_id = ?, hostname = ?, ip_address = ?, version = ?, status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&agent.agent_id)
        .bind(&agent.hostname)
        .bind(&agent.ip_address)
        .bind(&agent.version)
        .bind(agent.status.to_string())
        .bind(Self::timestamp_to_millis(&agent.updated_at))
        .bind(agent.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::QueryFailed(format!(
                "agent {} does not exist",
                agent.id
            )));
        }

        Ok(())
    }

    #[instrument(skip(self), fields(status = %status))]
    async fn find_agents_by_status(&self, status: AgentStatus) -> StorageResult<Vec<AgentRow>> {
        let rows = sqlx::query("SELECT * FROM agents WHERE status = ? ORDER BY id ASC")
            .bind(status.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::agent_from_row).collect()
    }

    #[instrument(skip(self, sample), fields(agent_id = %sample.agent_id, target = %sample.target))]
    async fn insert_sample(&self, sample: &SampleRow) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO samples (agent_id, target, timestamp, result, latency)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&sample.agent_id)
        .bind(&sample.target)
        .bind(Self::timestamp_to_millis(&sample.timestamp))
        .bind(sample.result.to_string())
        .bind(sample.latency)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self), fields(agent_id = %agent_id, target = %target))]
    async fn query_samples(
        &self,
        agent_id: &str,
        target: &str,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<SampleRow>> {
        let rows = sqlx::query(
            r#"
            SELECT agent_id, target, timestamp, result, latency
            FROM samples
            WHERE agent_id = ? AND target = ? AND timestamp >= ?
            ORDER BY timestamp ASC
            "#,
        )
        .bind(agent_id)
        .bind(target)
        .bind(Self::timestamp_to_millis(&since))
        .fetch_all(&self.pool)
        .await?;

        let samples: StorageResult<Vec<SampleRow>> =
            rows.iter().map(Self::sample_from_row).collect();

        let results = samples?;
        debug!("query returned {} samples", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => Ok(HealthStatus {
                healthy: true,
                message: format!("SQLite backend operational ({})", self.db_path),
            }),
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                })
            }
        }
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite backend");
        self.pool.close().await;
        Ok(())
    }
}
