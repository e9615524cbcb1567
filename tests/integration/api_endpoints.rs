//! REST endpoint behavior: target management, monitoring queries, health

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use meshping::ProbeResult;
use meshping::protocol::SampleEntry;
use meshping::storage::{SampleRow, StorageBackend};
use serde_json::{Value, json};

use crate::helpers::{register_pending_agent, spawn_test_hub};

fn entry(target: &str, result: &str, latency: Option<f64>) -> SampleEntry {
    SampleEntry {
        target: target.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        result: result.to_string(),
        latency,
    }
}

#[tokio::test]
async fn test_update_targets_round_trip() {
    let (addr, _hub) = spawn_test_hub().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/admin/update_targets", addr))
        .json(&json!({"targets": ["10.0.0.1", "10.0.0.2"]}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["targets"], json!(["10.0.0.1", "10.0.0.2"]));

    let response = client
        .get(format!("http://{}/admin/targets", addr))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["targets"], json!(["10.0.0.1", "10.0.0.2"]));
}

#[tokio::test]
async fn test_update_targets_rejects_malformed_bodies() {
    let (addr, _hub) = spawn_test_hub().await;
    let client = reqwest::Client::new();

    // Seed a valid set first; the bad requests must not disturb it.
    client
        .post(format!("http://{}/admin/update_targets", addr))
        .json(&json!({"targets": ["10.0.0.1"]}))
        .send()
        .await
        .unwrap();

    let bad_bodies = [
        json!({"name": "missing"}),
        json!({"targets": "not a list"}),
        json!({"targets": ["10.0.0.1", 123, "10.0.0.3"]}),
    ];

    for body in bad_bodies {
        let response = client
            .post(format!("http://{}/admin/update_targets", addr))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
    }

    // No JSON body at all.
    let response = client
        .post(format!("http://{}/admin/update_targets", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Previous set is untouched.
    let response = client
        .get(format!("http://{}/admin/targets", addr))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["targets"], json!(["10.0.0.1"]));
}

#[tokio::test]
async fn test_monitoring_query_reads_cache() {
    let (addr, hub) = spawn_test_hub().await;

    hub.state
        .ingest
        .ingest("agent_1", &[entry("8.8.8.8", "ok", Some(12.3))])
        .await
        .unwrap();

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/monitoring/agent_1/8.8.8.8", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    let points = body.as_array().unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["latency"], 12.3);
}

#[tokio::test]
async fn test_monitoring_query_zeroes_failed_probes() {
    let (addr, hub) = spawn_test_hub().await;

    hub.state
        .ingest
        .ingest("agent_1", &[entry("8.8.8.8", "fail", Some(55.5))])
        .await
        .unwrap();

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/monitoring/agent_1/8.8.8.8", addr))
        .send()
        .await
        .unwrap();

    let body: Value = response.json().await.unwrap();
    assert_eq!(body.as_array().unwrap()[0]["latency"], 0.0);
}

#[tokio::test]
async fn test_monitoring_query_falls_back_to_store_when_cache_is_cold() {
    let (addr, hub) = spawn_test_hub().await;

    // A sample that is inside the window but only present in the durable
    // store, as after a hub restart.
    hub.storage
        .insert_sample(&SampleRow {
            agent_id: "agent_1".to_string(),
            target: "8.8.8.8".to_string(),
            timestamp: Utc::now() - Duration::minutes(30),
            result: ProbeResult::Ok,
            latency: 12.3,
        })
        .await
        .unwrap();

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/monitoring/agent_1/8.8.8.8", addr))
        .send()
        .await
        .unwrap();

    let body: Value = response.json().await.unwrap();
    let points = body.as_array().unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["latency"], 12.3);
}

#[tokio::test]
async fn test_monitoring_query_excludes_samples_outside_window() {
    let (addr, hub) = spawn_test_hub().await;

    hub.storage
        .insert_sample(&SampleRow {
            agent_id: "agent_1".to_string(),
            target: "8.8.8.8".to_string(),
            timestamp: Utc::now() - Duration::hours(2),
            result: ProbeResult::Ok,
            latency: 45.6,
        })
        .await
        .unwrap();

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/monitoring/agent_1/8.8.8.8", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_agents_groups_by_status_without_passphrases() {
    let (addr, hub) = spawn_test_hub().await;

    register_pending_agent(&hub, "p1").await;
    register_pending_agent(&hub, "p2").await;

    let client = reqwest::Client::new();
    client
        .post(format!("http://{}/admin/approve/1", addr))
        .send()
        .await
        .unwrap();

    let response = client
        .get(format!("http://{}/admin/agents", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["approved"].as_array().unwrap().len(), 1);
    assert_eq!(body["pending"].as_array().unwrap().len(), 1);
    assert_eq!(body["hold"].as_array().unwrap().len(), 0);

    assert_eq!(body["approved"][0]["agent_id"], "agent_1");
    assert!(body["approved"][0].get("passphrase").is_none());
    assert!(body["pending"][0].get("passphrase").is_none());
}

#[tokio::test]
async fn test_health_reports_storage_status() {
    let (addr, _hub) = spawn_test_hub().await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["storage"].as_str().unwrap().contains("operational"));
}
