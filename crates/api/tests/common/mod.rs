#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use leasetrack_api::config::ServerConfig;
use leasetrack_api::router::build_app_router;
use leasetrack_api::state::AppState;
use leasetrack_db::MemoryStore;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        access_cache_ttl_secs: 300,
        max_batch_size: 500,
    }
}

/// Build the full application router over an in-memory store.
pub fn build_test_app(store: Arc<MemoryStore>) -> Router {
    build_test_app_with(store, test_config())
}

pub fn build_test_app_with(store: Arc<MemoryStore>, config: ServerConfig) -> Router {
    let state = AppState {
        store,
        pool: None,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

/// Seed a visible project and return its id.
pub fn seed_project(store: &MemoryStore) -> Uuid {
    let id = Uuid::new_v4();
    let row = json!({ "id": id.to_string(), "title": "HQ relocation" });
    store.seed("projects", row.as_object().cloned().unwrap());
    id
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
