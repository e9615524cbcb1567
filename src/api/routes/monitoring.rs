//! Recent sample query endpoint

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::trace;

use crate::ProbeResult;
use crate::api::{error::ApiResult, state::ApiState};
use crate::storage::StorageBackend;

/// GET /monitoring/:agent_id/:target
///
/// Samples for one (agent, target) pair within the recent window, as
/// `{timestamp, latency}` points for the dashboard's line graph. The
/// cache is consulted first; an empty cache result falls back to the
/// durable store over the same window. Failed probes always report
/// latency 0, whatever the agent submitted.
pub async fn get_monitoring_data(
    State(state): State<ApiState>,
    Path((agent_id, target)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let mut samples = state.cache.query(&agent_id, &target).await;

    if samples.is_empty() {
        trace!("cache miss for ({}, {}), querying store", agent_id, target);
        let since = Utc::now() - state.cache.window();
        samples = state.storage.query_samples(&agent_id, &target, since).await?;
    }

    let points: Vec<Value> = samples
        .iter()
        .map(|sample| {
            let latency = match sample.result {
                ProbeResult::Ok => sample.latency,
                ProbeResult::Fail => 0.0,
            };
            json!({
                "timestamp": sample.timestamp.to_rfc3339(),
                "latency": latency,
            })
        })
        .collect();

    Ok(Json(Value::Array(points)))
}
