//! Batched application of approved suggestions.
//!
//! Suggestions are grouped by `(entity kind, action)` and each group is
//! applied on its own. Property inserts go through an ordered path that
//! assigns fractional order keys per project and writes each project's rows
//! in one insert. Everything else is written item by item, concurrently,
//! with every outcome collected. One bad item never aborts the batch.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use indexmap::IndexMap;
use leasetrack_core::entity::{EntityKind, ORDER_KEY_FIELD, PROJECT_ID_FIELD, UPDATED_AT_FIELD};
use leasetrack_core::order_key::key_before_all;
use leasetrack_core::storage_error::user_message;
use leasetrack_core::store::{Filter, RecordStore};
use leasetrack_core::suggestion::{BatchResult, SuggestionAction, UpdateSuggestion};
use leasetrack_core::types::{EntityId, Timestamp};
use serde_json::Value;

use crate::access::{referenced_project_id, ProjectAccessValidator};
use crate::config::PipelineConfig;
use crate::payload::{build_insert_payload, build_update_payload};

type GroupKey = (EntityKind, SuggestionAction);

/// Applies batches of approved suggestions to a [`RecordStore`].
///
/// Holds one access cache for its lifetime; create one processor per batch
/// session.
pub struct SuggestionBatchProcessor {
    store: Arc<dyn RecordStore>,
    access: ProjectAccessValidator,
}

impl SuggestionBatchProcessor {
    pub fn new(store: Arc<dyn RecordStore>, config: &PipelineConfig) -> Self {
        let access = ProjectAccessValidator::new(store.clone(), config.access_cache_ttl);
        Self { store, access }
    }

    pub fn access_validator(&self) -> &ProjectAccessValidator {
        &self.access
    }

    /// Apply every suggestion and report what happened to each.
    ///
    /// Never fails as a whole: validation, access and storage problems are
    /// recorded per item. A panic while writing one item fails that item
    /// only; a panic anywhere else marks every item not yet accounted for as
    /// failed.
    pub async fn apply_approved_suggestions(&self, suggestions: &[UpdateSuggestion]) -> BatchResult {
        if suggestions.is_empty() {
            return BatchResult::empty();
        }

        let total = suggestions.len();
        let mut result = BatchResult::default();
        let outcome = AssertUnwindSafe(self.process(suggestions, &mut result))
            .catch_unwind()
            .await;

        if let Err(panic) = outcome {
            let message = panic_message(panic.as_ref());
            tracing::error!(error = %message, "Suggestion batch aborted unexpectedly");
            let remaining = total.saturating_sub(result.settled_count());
            if remaining > 0 {
                result.record_failed(remaining, format!("Unexpected error while applying suggestions: {message}"));
            }
        }

        let result = result.finish();
        tracing::info!(
            total,
            processed = result.processed_count,
            failed = result.failed_count,
            success = result.success,
            "Applied suggestion batch"
        );
        result
    }

    async fn process(&self, suggestions: &[UpdateSuggestion], result: &mut BatchResult) {
        self.prewarm_access(suggestions).await;

        let mut groups: BTreeMap<GroupKey, Vec<&UpdateSuggestion>> = BTreeMap::new();
        for suggestion in suggestions {
            groups
                .entry((suggestion.entity_type, suggestion.action))
                .or_default()
                .push(suggestion);
        }

        for ((kind, action), items) in groups {
            tracing::debug!(
                entity_type = %kind,
                action = action.as_str(),
                count = items.len(),
                "Applying suggestion group"
            );
            match (kind, action) {
                (EntityKind::Property, SuggestionAction::Insert) => {
                    self.apply_property_inserts(&items, result).await;
                }
                _ => self.apply_individually(&items, result).await,
            }
        }
    }

    /// Resolve every referenced project with a single lookup.
    async fn prewarm_access(&self, suggestions: &[UpdateSuggestion]) {
        let ids: Vec<EntityId> = suggestions
            .iter()
            .filter_map(referenced_project_id)
            .filter_map(Result::ok)
            .collect();
        if !ids.is_empty() {
            self.access.validate_many(&ids).await;
        }
    }

    // -----------------------------------------------------------------------
    // Ordered path (property inserts)
    // -----------------------------------------------------------------------

    async fn apply_property_inserts(&self, items: &[&UpdateSuggestion], result: &mut BatchResult) {
        let mut by_project: IndexMap<EntityId, Vec<&UpdateSuggestion>> = IndexMap::new();

        for suggestion in items {
            let validation = self.access.validate_with_access(suggestion).await;
            if !validation.is_valid() {
                let error = invalid_message(suggestion, &validation.all_errors());
                tracing::warn!(suggestion_id = %suggestion.id, error = %error, "Suggestion rejected");
                result.record_failed(1, error);
                continue;
            }
            match referenced_project_id(suggestion) {
                Some(Ok(project_id)) => by_project.entry(project_id).or_default().push(suggestion),
                _ => result.record_failed(
                    1,
                    invalid_message(suggestion, &[format!("Missing required field: {PROJECT_ID_FIELD}")]),
                ),
            }
        }

        let now = Utc::now();
        for (project_id, group) in by_project {
            match self.insert_property_group(project_id, &group, now).await {
                Ok(()) => {
                    tracing::info!(project_id = %project_id, count = group.len(), "Inserted properties");
                    result.record_processed(group.len());
                }
                Err(error) => {
                    tracing::warn!(project_id = %project_id, count = group.len(), error = %error, "Property insert failed");
                    result.record_failed(group.len(), error);
                }
            }
        }
    }

    /// Give each new property a key before every existing one, most recent
    /// first, and write the whole group at once.
    async fn insert_property_group(
        &self,
        project_id: EntityId,
        group: &[&UpdateSuggestion],
        now: Timestamp,
    ) -> Result<(), String> {
        let table = EntityKind::Property.table();
        let label = EntityKind::Property.schema().label;

        let existing = self
            .store
            .select(
                table,
                &[ORDER_KEY_FIELD],
                &[Filter::eq(PROJECT_ID_FIELD, project_id.to_string())],
            )
            .await
            .map_err(|e| {
                format!(
                    "Failed to read property order for project {project_id}: {}",
                    user_message(&e, label)
                )
            })?;

        let mut keys: Vec<String> = existing
            .iter()
            .filter_map(|row| row.get(ORDER_KEY_FIELD).and_then(Value::as_str))
            .map(str::to_string)
            .collect();

        let mut rows = Vec::with_capacity(group.len());
        for suggestion in group {
            let key = key_before_all(&keys)
                .map_err(|e| format!("Failed to assign order for {}: {e}", suggestion.display_name()))?;
            let mut row = build_insert_payload(suggestion, now);
            row.insert(ORDER_KEY_FIELD.to_string(), Value::String(key.clone()));
            keys.push(key);
            rows.push(row);
        }

        self.store.insert(table, rows).await.map_err(|e| {
            format!(
                "Failed to add {} properties to project {project_id}: {}",
                group.len(),
                user_message(&e, label)
            )
        })
    }

    // -----------------------------------------------------------------------
    // Generic path
    // -----------------------------------------------------------------------

    async fn apply_individually(&self, items: &[&UpdateSuggestion], result: &mut BatchResult) {
        let now = Utc::now();
        let outcomes = join_all(items.iter().map(|s| async move {
            AssertUnwindSafe(self.apply_one(s, now))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(format!(
                        "Unexpected error while applying {}: {}",
                        s.display_name(),
                        panic_message(panic.as_ref())
                    ))
                })
        }))
        .await;

        for (suggestion, outcome) in items.iter().zip(outcomes) {
            match outcome {
                Ok(()) => result.record_processed(1),
                Err(error) => {
                    tracing::warn!(suggestion_id = %suggestion.id, error = %error, "Suggestion failed");
                    result.record_failed(1, error);
                }
            }
        }
    }

    async fn apply_one(&self, suggestion: &UpdateSuggestion, now: Timestamp) -> Result<(), String> {
        let schema = suggestion.entity_type.schema();
        let name = suggestion.display_name();

        let entity_id = match suggestion.action {
            SuggestionAction::Update => Some(
                suggestion
                    .entity_id
                    .ok_or_else(|| format!("Cannot update {name}: no {} id given", schema.label))?,
            ),
            SuggestionAction::Insert => None,
        };

        let validation = self.access.validate_with_access(suggestion).await;
        if !validation.is_valid() {
            return Err(invalid_message(suggestion, &validation.all_errors()));
        }

        match entity_id {
            None => {
                let row = build_insert_payload(suggestion, now);
                self.store
                    .insert(schema.table, vec![row])
                    .await
                    .map_err(|e| format!("Failed to create {name}: {}", user_message(&e, schema.label)))
            }
            Some(id) => {
                let row = build_update_payload(suggestion, now);
                if !row.keys().any(|column| column != UPDATED_AT_FIELD) {
                    return Err(format!(
                        "Failed to update {name}: no applicable values after coercion"
                    ));
                }
                let changed = self
                    .store
                    .update(schema.table, row, &[Filter::eq("id", id.to_string())])
                    .await
                    .map_err(|e| format!("Failed to update {name}: {}", user_message(&e, schema.label)))?;
                if changed == 0 {
                    return Err(format!(
                        "Failed to update {name}: {} {id} not found or access denied",
                        schema.label
                    ));
                }
                Ok(())
            }
        }
    }
}

fn invalid_message(suggestion: &UpdateSuggestion, errors: &[String]) -> String {
    format!("{}: {}", suggestion.display_name(), errors.join("; "))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
