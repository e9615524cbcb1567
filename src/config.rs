use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::trace;

/// Storage backend configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (no persistence)
    #[serde(rename = "none")]
    None,

    /// SQLite database (default)
    Sqlite {
        /// Path to the SQLite database file
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./meshping.db")
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Address the hub listens on (HTTP + agent WebSocket)
    pub listen: Option<SocketAddr>,

    /// Storage configuration (optional - defaults to SQLite)
    pub storage: Option<StorageConfig>,

    /// Retention window of the in-memory sample cache, in seconds
    #[serde(default = "default_cache_window_secs")]
    pub cache_window_secs: u64,

    /// Per-channel timeout for broadcast pushes, in milliseconds
    #[serde(default = "default_push_timeout_ms")]
    pub push_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: None,
            storage: None,
            cache_window_secs: default_cache_window_secs(),
            push_timeout_ms: default_push_timeout_ms(),
        }
    }
}

fn default_cache_window_secs() -> u64 {
    3600
}

fn default_push_timeout_ms() -> u64 {
    500
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
