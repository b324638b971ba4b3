#![allow(dead_code)]

use std::sync::Arc;

use leasetrack_core::suggestion::UpdateSuggestion;
use leasetrack_core::types::Row;
use leasetrack_db::MemoryStore;
use leasetrack_pipeline::{PipelineConfig, SuggestionBatchProcessor};
use serde_json::{json, Value};
use uuid::Uuid;

/// Convert a JSON object literal into a row.
pub fn row(value: Value) -> Row {
    value.as_object().cloned().expect("row literal must be an object")
}

/// Seed a visible project and return its id.
pub fn seed_project(store: &MemoryStore) -> Uuid {
    let id = Uuid::new_v4();
    store.seed("projects", row(json!({ "id": id.to_string(), "title": "HQ relocation" })));
    id
}

/// Seed a project the caller cannot see and return its id.
pub fn seed_hidden_project(store: &MemoryStore) -> Uuid {
    let id = Uuid::new_v4();
    store.seed_hidden("projects", row(json!({ "id": id.to_string(), "title": "Someone else's" })));
    id
}

pub fn processor(store: &Arc<MemoryStore>) -> SuggestionBatchProcessor {
    SuggestionBatchProcessor::new(store.clone(), &PipelineConfig::default())
}

pub fn suggestion(value: Value) -> UpdateSuggestion {
    serde_json::from_value(value).expect("suggestion literal must deserialize")
}

pub fn property_insert(id: &str, project_id: Uuid, name: &str) -> UpdateSuggestion {
    suggestion(json!({
        "id": id,
        "entity_type": "property",
        "action": "insert",
        "entity_name": name,
        "values": {
            "project_id": project_id.to_string(),
            "name": name,
            "address": "1 Main St"
        }
    }))
}

pub fn property_update(id: &str, property_id: Uuid, values: Value) -> UpdateSuggestion {
    suggestion(json!({
        "id": id,
        "entity_type": "property",
        "action": "update",
        "entity_id": property_id,
        "values": values
    }))
}

/// Order keys of every stored property, in insertion order.
pub fn order_keys(store: &MemoryStore) -> Vec<String> {
    store
        .rows("properties")
        .iter()
        .filter_map(|r| r.get("order_key").and_then(Value::as_str).map(str::to_string))
        .collect()
}
