//! Helper functions for integration tests

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use meshping::{
    api::{ApiConfig, ApiState, spawn_api_server},
    cache::RecentWindowCache,
    gateway::BroadcastGateway,
    ingest::IngestionPipeline,
    registry::AgentRegistry,
    storage::{StorageBackend, memory::MemoryBackend},
    targets::TargetSet,
};

/// A fully wired hub backed by in-memory storage.
pub struct TestHub {
    pub state: ApiState,
    pub storage: Arc<MemoryBackend>,
}

pub fn build_hub() -> TestHub {
    let storage = Arc::new(MemoryBackend::new());
    let backend: Arc<dyn StorageBackend> = storage.clone();

    let gateway = Arc::new(BroadcastGateway::new(Duration::from_millis(100)));
    let cache = Arc::new(RecentWindowCache::new(chrono::Duration::hours(1)));
    let registry = Arc::new(AgentRegistry::new(backend.clone()));
    let targets = Arc::new(TargetSet::new(gateway.clone()));
    let ingest = Arc::new(IngestionPipeline::new(backend.clone(), cache.clone()));

    let state = ApiState::new(registry, targets, ingest, cache, gateway, backend);

    TestHub { state, storage }
}

/// Spawn a hub on a random local port and return its address.
pub async fn spawn_test_hub() -> (SocketAddr, TestHub) {
    let hub = build_hub();
    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        enable_cors: true,
    };

    let addr = spawn_api_server(config, hub.state.clone()).await.unwrap();
    (addr, hub)
}

/// Register a pending agent through the registry and return its db id.
pub async fn register_pending_agent(hub: &TestHub, passphrase: &str) -> i64 {
    use meshping::registry::HandshakeRequest;

    hub.state
        .registry
        .handshake(HandshakeRequest {
            passphrase: passphrase.to_string(),
            hostname: "probe-01".to_string(),
            ip_address: "192.0.2.10".to_string(),
            version: "1.0.0".to_string(),
        })
        .await
        .unwrap();

    hub.storage
        .find_agent_by_passphrase(passphrase)
        .await
        .unwrap()
        .unwrap()
        .id
}
