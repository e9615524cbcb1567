//! HTTP and WebSocket surface of the meshping hub
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **Component handles** bundled in `ApiState`; handlers never touch
//!   shared mutable state outside the component contracts
//! - **WebSocket** upgrade at `/agent` for the per-agent channel
//!
//! ## Endpoints
//!
//! - `GET  /health` - Hub and storage health
//! - `GET  /admin/agents` - Agents grouped by status
//! - `POST /admin/approve/{id}` - Approve an agent
//! - `POST /admin/reject/{id}` - Blacklist an agent
//! - `GET  /admin/targets` - Current target set
//! - `POST /admin/update_targets` - Replace the target set
//! - `GET  /monitoring/{agent_id}/{target}` - Recent samples
//! - `WS   /agent` - Agent messaging channel

pub mod error;
pub mod routes;
pub mod state;
pub mod websocket;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:5000")
    pub bind_addr: SocketAddr,

    /// Enable CORS for dashboard
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".parse().unwrap(),
            enable_cors: true,
        }
    }
}

/// Build the hub router with all routes
pub fn router(state: ApiState) -> Router {
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/admin/agents", get(routes::admin::list_agents))
        .route("/admin/approve/:id", post(routes::admin::approve_agent))
        .route("/admin/reject/:id", post(routes::admin::reject_agent))
        .route("/admin/targets", get(routes::admin::get_targets))
        .route(
            "/admin/update_targets",
            post(routes::admin::update_targets),
        )
        .route(
            "/monitoring/:agent_id/:target",
            get(routes::monitoring::get_monitoring_data),
        )
        .route("/agent", get(websocket::agent_socket_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    use tower_http::cors::{Any, CorsLayer};

    info!("starting API server on {}", config.bind_addr);

    let mut app = router(state);

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
