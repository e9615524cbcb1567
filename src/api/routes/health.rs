//! Health check endpoint

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::api::{error::ApiResult, state::ApiState};
use crate::storage::StorageBackend;

/// GET /health
///
/// Reports hub liveness and the storage backend's health.
pub async fn health_check(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let storage = state.storage.health_check().await?;

    Ok(Json(json!({
        "status": if storage.healthy { "ok" } else { "degraded" },
        "storage": storage.message,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}
