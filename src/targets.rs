//! Target set
//!
//! The single process-wide list of addresses every approved agent must
//! probe. The raw container is never exposed: all access goes through
//! `get`/`replace` so a read can never observe a half-applied update, and
//! the broadcast that follows every mutation is a named side effect of
//! this component rather than something hidden in the admin handlers.

use tokio::sync::RwLock;
use tracing::info;

use crate::gateway::BroadcastGateway;
use std::sync::Arc;

/// Process-wide monitoring target list
pub struct TargetSet {
    current: RwLock<Vec<String>>,
    gateway: Arc<BroadcastGateway>,
}

impl TargetSet {
    pub fn new(gateway: Arc<BroadcastGateway>) -> Self {
        Self {
            current: RwLock::new(Vec::new()),
            gateway,
        }
    }

    /// Snapshot of the current target list.
    pub async fn get(&self) -> Vec<String> {
        self.current.read().await.clone()
    }

    /// Replace the whole set and push it to all approved agents.
    ///
    /// Replacement is wholesale: no merging, no address syntax checks.
    /// Agents replace their local list on receipt, so late or duplicate
    /// delivery is harmless.
    pub async fn replace(&self, targets: Vec<String>) {
        {
            let mut current = self.current.write().await;
            *current = targets.clone();
        }
        info!("target set replaced ({} targets)", targets.len());
        self.gateway.push_target_update(targets).await;
    }

    /// Re-broadcast the current set without changing it.
    ///
    /// Invoked after agent approval: any status change may leave stale
    /// listeners, and re-pushing to the whole fleet is idempotent.
    pub async fn resync(&self) {
        let targets = self.get().await;
        self.gateway.push_target_update(targets).await;
    }
}
