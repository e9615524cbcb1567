//! Ingestion pipeline
//!
//! Validates and persists monitoring batches submitted by agents, then
//! updates the recent window cache. Agents send best-effort batches every
//! few seconds, so one malformed entry never blocks its siblings: bad
//! entries are skipped and counted, and the counts go back in the ack.
//! A durable-store failure, by contrast, is fatal for the whole call.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, trace, warn};

use crate::ProbeResult;
use crate::cache::RecentWindowCache;
use crate::protocol::SampleEntry;
use crate::storage::{SampleRow, StorageBackend, StorageResult};

/// Per-batch ingestion outcome, reported back to the agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Entries validated, persisted and cached
    pub accepted: usize,

    /// Malformed entries skipped (bad timestamp, result, or latency)
    pub rejected: usize,
}

/// Sample validation, persistence and cache maintenance
pub struct IngestionPipeline {
    storage: Arc<dyn StorageBackend>,
    cache: Arc<RecentWindowCache>,
}

impl IngestionPipeline {
    pub fn new(storage: Arc<dyn StorageBackend>, cache: Arc<RecentWindowCache>) -> Self {
        Self { storage, cache }
    }

    /// Ingest one monitoring batch for the given agent public id.
    ///
    /// Each accepted entry is written to the durable store first, then
    /// appended to the cache; the cache update can never fail the call.
    /// Latency is zeroed whenever the result is not `ok`, regardless of
    /// what the agent sent.
    pub async fn ingest(
        &self,
        agent_id: &str,
        entries: &[SampleEntry],
    ) -> StorageResult<IngestReport> {
        let mut report = IngestReport::default();

        for entry in entries {
            let Some(timestamp) = parse_timestamp(&entry.timestamp) else {
                debug!(
                    "skipping entry with unparsable timestamp {:?} from {}",
                    entry.timestamp, agent_id
                );
                report.rejected += 1;
                continue;
            };

            let Ok(result) = entry.result.parse::<ProbeResult>() else {
                debug!(
                    "skipping entry with unknown result {:?} from {}",
                    entry.result, agent_id
                );
                report.rejected += 1;
                continue;
            };

            let submitted = entry.latency.unwrap_or(0.0);
            if submitted.is_nan() || submitted < 0.0 {
                debug!(
                    "skipping entry with invalid latency {:?} from {}",
                    entry.latency, agent_id
                );
                report.rejected += 1;
                continue;
            }

            let latency = match result {
                ProbeResult::Ok => submitted,
                ProbeResult::Fail => 0.0,
            };

            let sample = SampleRow {
                agent_id: agent_id.to_string(),
                target: entry.target.clone(),
                timestamp,
                result,
                latency,
            };

            self.storage.insert_sample(&sample).await?;
            self.cache.append(sample).await;
            report.accepted += 1;
        }

        if report.rejected > 0 {
            warn!(
                "batch from {}: accepted {}, rejected {}",
                agent_id, report.accepted, report.rejected
            );
        } else {
            trace!("batch from {}: accepted {}", agent_id, report.accepted);
        }

        Ok(report)
    }
}

/// Parse a caller-supplied timestamp.
///
/// Accepts RFC 3339 as well as the naive `2025-02-15T12:00:00` form agents
/// have historically sent; naive times are taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
