//! API shared state containing component handles

use std::sync::Arc;

use crate::cache::RecentWindowCache;
use crate::gateway::BroadcastGateway;
use crate::ingest::IngestionPipeline;
use crate::registry::AgentRegistry;
use crate::storage::StorageBackend;
use crate::targets::TargetSet;

/// Shared state passed to all API and WebSocket handlers
///
/// Handlers never touch shared mutable state directly; everything goes
/// through the component contracts bundled here.
#[derive(Clone)]
pub struct ApiState {
    /// Agent identity and lifecycle transitions
    pub registry: Arc<AgentRegistry>,

    /// Process-wide monitoring target list
    pub targets: Arc<TargetSet>,

    /// Sample validation, persistence and cache maintenance
    pub ingest: Arc<IngestionPipeline>,

    /// Recent sample index for hot queries
    pub cache: Arc<RecentWindowCache>,

    /// Connected agent channels
    pub gateway: Arc<BroadcastGateway>,

    /// Durable store, the source of truth behind the cache
    pub storage: Arc<dyn StorageBackend>,
}

impl ApiState {
    pub fn new(
        registry: Arc<AgentRegistry>,
        targets: Arc<TargetSet>,
        ingest: Arc<IngestionPipeline>,
        cache: Arc<RecentWindowCache>,
        gateway: Arc<BroadcastGateway>,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            registry,
            targets,
            ingest,
            cache,
            gateway,
            storage,
        }
    }
}
