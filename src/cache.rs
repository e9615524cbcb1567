//! Recent window cache
//!
//! Bounded, time-windowed in-memory index of the most recent samples per
//! agent. The ingestion pipeline appends after every durable write; query
//! handlers read concurrently. An empty query result is the documented
//! signal to fall back to the durable store, which keeps this structure a
//! strict performance optimization: it is rebuilt from empty on restart
//! and never consulted for correctness.

use std::collections::{HashMap, VecDeque};

use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use crate::storage::SampleRow;

/// Time-windowed per-agent sample index
pub struct RecentWindowCache {
    window: Duration,
    entries: RwLock<HashMap<String, VecDeque<SampleRow>>>,
}

impl RecentWindowCache {
    /// Create a cache retaining samples for the given window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Append a sample to its agent's sequence and trim stale entries.
    ///
    /// Samples arrive in roughly chronological order and batches are
    /// small, so a linear retain over the deque is enough.
    pub async fn append(&self, sample: SampleRow) {
        let cutoff = Utc::now() - self.window;
        let mut entries = self.entries.write().await;
        let sequence = entries.entry(sample.agent_id.clone()).or_default();
        sequence.push_back(sample);
        sequence.retain(|s| s.timestamp >= cutoff);
    }

    /// Samples for one (agent, target) pair inside the window at call time.
    ///
    /// Returns an empty vec for unknown agents or when nothing matches;
    /// callers treat that as a miss and query the durable store.
    pub async fn query(&self, agent_id: &str, target: &str) -> Vec<SampleRow> {
        let cutoff = Utc::now() - self.window;
        let entries = self.entries.read().await;
        entries
            .get(agent_id)
            .map(|sequence| {
                sequence
                    .iter()
                    .filter(|s| s.target == target && s.timestamp >= cutoff)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}
