//! Integration tests for `POST /api/v1/suggestions/apply`.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{body_json, build_test_app, build_test_app_with, post_json, seed_project, test_config};
use leasetrack_db::{MemoryStore, StoreOp};
use serde_json::json;

// ---------------------------------------------------------------------------
// Test: empty batch returns an empty successful result
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_batch_returns_success() {
    let app = build_test_app(Arc::new(MemoryStore::new()));
    let response = post_json(app, "/api/v1/suggestions/apply", json!({ "suggestions": [] })).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["data"],
        json!({ "success": true, "processed_count": 0, "failed_count": 0, "errors": [] })
    );
}

// ---------------------------------------------------------------------------
// Test: mixed batch reports per-item outcomes with a 200
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mixed_batch_reports_item_failures() {
    let store = Arc::new(MemoryStore::new());
    let project = seed_project(&store);
    let app = build_test_app(store.clone());

    let body = json!({
        "suggestions": [
            {
                "id": "s1",
                "entity_type": "property",
                "action": "insert",
                "entity_name": "Tower A",
                "values": { "project_id": project, "name": "Tower A", "total_sqft": "12,000" },
                "reasoning": "Broker email lists Tower A"
            },
            {
                "id": "s2",
                "entity_type": "property",
                "action": "insert",
                "entity_name": "Tower B",
                "values": { "name": "Tower B" }
            }
        ]
    });
    let response = post_json(app, "/api/v1/suggestions/apply", body).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["success"], false);
    assert_eq!(json["data"]["processed_count"], 1);
    assert_eq!(json["data"]["failed_count"], 1);
    assert!(json["data"]["errors"][0].as_str().unwrap().contains("project_id"));

    let rows = store.rows("properties");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["total_sqft"], json!(12000.0));
    assert_eq!(rows[0]["order_key"], json!("a0"));
}

// ---------------------------------------------------------------------------
// Test: duplicate suggestion ids are accepted
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_suggestion_ids_are_all_applied() {
    let store = Arc::new(MemoryStore::new());
    let project = seed_project(&store);
    let app = build_test_app(store.clone());

    let requirement = |text: &str| {
        json!({
            "id": "dup",
            "entity_type": "client_requirement",
            "action": "insert",
            "values": { "project_id": project, "category": "location", "requirement_text": text }
        })
    };
    let body = json!({
        "suggestions": [requirement("Near a train station"), requirement("Walkable to restaurants")]
    });
    let response = post_json(app, "/api/v1/suggestions/apply", body).await;

    let json = body_json(response).await;
    assert_eq!(json["data"]["processed_count"], 2);
    assert_eq!(store.rows("client_requirements").len(), 2);
    assert_eq!(store.calls("projects", StoreOp::Select), 1);
}

// ---------------------------------------------------------------------------
// Test: oversized batch is rejected
// ---------------------------------------------------------------------------

#[tokio::test]
async fn oversized_batch_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let mut config = test_config();
    config.max_batch_size = 1;
    let app = build_test_app_with(store.clone(), config);

    let project_insert = json!({
        "id": "s",
        "entity_type": "project",
        "action": "insert",
        "values": { "title": "New HQ" }
    });
    let body = json!({ "suggestions": [project_insert.clone(), project_insert] });
    let response = post_json(app, "/api/v1/suggestions/apply", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(store.rows("projects").is_empty());
}

// ---------------------------------------------------------------------------
// Test: unknown entity type is rejected by the body extractor
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_entity_type_is_unprocessable() {
    let app = build_test_app(Arc::new(MemoryStore::new()));
    let body = json!({
        "suggestions": [{ "id": "s1", "entity_type": "tenant", "action": "insert", "values": {} }]
    });
    let response = post_json(app, "/api/v1/suggestions/apply", body).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
