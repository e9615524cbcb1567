//! Administrator endpoints: agent arbitration and target management

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::storage::{AgentRow, StorageBackend};
use crate::{
    AgentStatus,
    api::{error::ApiError, error::ApiResult, state::ApiState},
};

/// Agent view returned to administrators
///
/// Deliberately omits the passphrase: it is a bearer credential and never
/// leaves the registry/storage layers.
#[derive(Debug, Serialize)]
struct AgentInfo {
    id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent_id: Option<String>,
    hostname: String,
    ip_address: String,
    version: String,
    status: AgentStatus,
    registered_at: String,
    updated_at: String,
}

impl From<&AgentRow> for AgentInfo {
    fn from(agent: &AgentRow) -> Self {
        Self {
            id: agent.id,
            agent_id: agent.agent_id.clone(),
            hostname: agent.hostname.clone(),
            ip_address: agent.ip_address.clone(),
            version: agent.version.clone(),
            status: agent.status,
            registered_at: agent.registered_at.to_rfc3339(),
            updated_at: agent.updated_at.to_rfc3339(),
        }
    }
}

/// GET /admin/agents
///
/// List agents grouped by lifecycle status for the admin dashboard.
pub async fn list_agents(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let mut grouped = serde_json::Map::new();

    for status in [AgentStatus::Pending, AgentStatus::Approved, AgentStatus::Hold] {
        let agents = state.storage.find_agents_by_status(status).await?;
        let infos: Vec<AgentInfo> = agents.iter().map(AgentInfo::from).collect();
        grouped.insert(status.to_string(), json!(infos));
    }

    Ok(Json(Value::Object(grouped)))
}

/// POST /admin/approve/:id
///
/// Approve a pending or held agent. The registry commits the status change
/// (assigning the public id on first approval) before the target set is
/// re-broadcast to the whole fleet.
pub async fn approve_agent(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let agent_id = state.registry.approve(id).await?;

    // Broadcast only after the commit; any stale listener picks up the
    // current set, and the push is idempotent.
    state.targets.resync().await;

    Ok(Json(json!({
        "message": "Agent approved",
        "agent_id": agent_id,
    })))
}

/// POST /admin/reject/:id
///
/// Permanently blacklist an agent.
pub async fn reject_agent(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    state.registry.reject(id).await?;

    Ok(Json(json!({
        "message": "Agent rejected and blacklisted",
    })))
}

/// GET /admin/targets
///
/// Current monitoring target list.
pub async fn get_targets(State(state): State<ApiState>) -> Json<Value> {
    let targets = state.targets.get().await;
    Json(json!({ "targets": targets }))
}

/// POST /admin/update_targets
///
/// Replace the monitoring target list wholesale and push it to all
/// connected approved agents.
///
/// The body is validated by hand so every malformed shape (no body, no
/// `targets` field, non-array, non-string elements) yields the 400 this
/// endpoint contracts; a typed extractor would answer 415/422 for some of
/// them. A 400 leaves the previous set untouched.
pub async fn update_targets(
    State(state): State<ApiState>,
    payload: Option<Json<Value>>,
) -> ApiResult<Json<Value>> {
    let Some(Json(payload)) = payload else {
        return Err(ApiError::Validation("No targets provided".to_string()));
    };

    let Some(raw_targets) = payload.get("targets") else {
        return Err(ApiError::Validation("No targets provided".to_string()));
    };

    let Some(list) = raw_targets.as_array() else {
        return Err(ApiError::Validation(
            "Targets must be a list of strings".to_string(),
        ));
    };

    let mut targets = Vec::with_capacity(list.len());
    for element in list {
        match element.as_str() {
            Some(target) => targets.push(target.to_string()),
            None => {
                return Err(ApiError::Validation(
                    "Targets must be a list of strings".to_string(),
                ));
            }
        }
    }

    state.targets.replace(targets.clone()).await;

    Ok(Json(json!({
        "message": "Targets updated",
        "targets": targets,
    })))
}
