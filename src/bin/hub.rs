use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use meshping::{
    api::{ApiConfig, ApiState, spawn_api_server},
    cache::RecentWindowCache,
    config::{Config, StorageConfig, read_config_file},
    gateway::BroadcastGateway,
    ingest::IngestionPipeline,
    registry::AgentRegistry,
    storage::{StorageBackend, memory::MemoryBackend, sqlite::SqliteBackend},
    targets::TargetSet,
};
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: Option<String>,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("meshping", LevelFilter::TRACE),
        ("meshping_hub", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(path) => read_config_file(path)?,
        None => Config::default(),
    };

    let storage: Arc<dyn StorageBackend> = match config.storage.clone().unwrap_or_default() {
        StorageConfig::None => {
            info!("using in-memory storage (no persistence)");
            Arc::new(MemoryBackend::new())
        }
        StorageConfig::Sqlite { path } => Arc::new(SqliteBackend::new(&path).await?),
    };

    let gateway = Arc::new(BroadcastGateway::new(Duration::from_millis(
        config.push_timeout_ms,
    )));
    let cache = Arc::new(RecentWindowCache::new(chrono::Duration::seconds(
        config.cache_window_secs as i64,
    )));
    let registry = Arc::new(AgentRegistry::new(storage.clone()));
    let targets = Arc::new(TargetSet::new(gateway.clone()));
    let ingest = Arc::new(IngestionPipeline::new(storage.clone(), cache.clone()));

    let state = ApiState::new(
        registry,
        targets,
        ingest,
        cache,
        gateway,
        storage.clone(),
    );

    let api_config = ApiConfig {
        bind_addr: config
            .listen
            .unwrap_or(ApiConfig::default().bind_addr),
        enable_cors: true,
    };

    let addr = spawn_api_server(api_config, state).await?;
    info!("meshping hub listening on {addr}");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    if let Err(e) = storage.close().await {
        error!("error closing storage backend: {e}");
    }

    Ok(())
}
