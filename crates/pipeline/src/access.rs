//! Project access checks with a time-bounded cache.
//!
//! "Access" means the caller can see the project row through the store. A
//! project that does not exist and one hidden by row-level authorization are
//! indistinguishable and both reported as invalid.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use leasetrack_core::entity::{EntityKind, PROJECT_ID_FIELD};
use leasetrack_core::entity_validation::{referenced_project, validate_suggestion, ValidationResult};
use leasetrack_core::store::{Filter, RecordStore};
use leasetrack_core::suggestion::{SuggestionAction, UpdateSuggestion};
use leasetrack_core::types::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Outcome of checking one project id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAccess {
    pub is_valid: bool,
    pub exists: bool,
    pub has_access: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProjectAccess {
    fn granted() -> Self {
        Self {
            is_valid: true,
            exists: true,
            has_access: true,
            error: None,
        }
    }

    fn denied(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            exists: false,
            has_access: false,
            error: Some(error.into()),
        }
    }

    fn not_found(id: EntityId) -> Self {
        Self::denied(format!("Project {id} not found or access denied"))
    }
}

/// Structural validation plus project-access findings for one suggestion.
#[derive(Debug, Clone, Default)]
pub struct AccessValidationResult {
    pub base: ValidationResult,
    pub project_validation_errors: Vec<String>,
}

impl AccessValidationResult {
    pub fn is_valid(&self) -> bool {
        self.base.is_valid && self.project_validation_errors.is_empty()
    }

    /// Structural errors followed by access errors.
    pub fn all_errors(&self) -> Vec<String> {
        let mut errors = self.base.error_messages();
        errors.extend(self.project_validation_errors.iter().cloned());
        errors
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Project id to "visible to the caller", valid for a fixed lifetime.
#[derive(Debug)]
pub struct AccessCache {
    created_at: Instant,
    ttl: Duration,
    entries: HashMap<EntityId, bool>,
}

impl AccessCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            created_at: Instant::now(),
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }

    /// Drop every entry and restart the lifetime.
    pub fn invalidate(&mut self) {
        self.entries.clear();
        self.created_at = Instant::now();
    }

    pub fn get(&self, id: &EntityId) -> Option<bool> {
        self.entries.get(id).copied()
    }

    pub fn insert(&mut self, id: EntityId, visible: bool) {
        self.entries.insert(id, visible);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Checks that referenced projects exist and are visible to the caller.
pub struct ProjectAccessValidator {
    store: Arc<dyn RecordStore>,
    cache: Mutex<AccessCache>,
}

impl ProjectAccessValidator {
    pub fn new(store: Arc<dyn RecordStore>, ttl: Duration) -> Self {
        Self {
            store,
            cache: Mutex::new(AccessCache::new(ttl)),
        }
    }

    fn cache(&self) -> MutexGuard<'_, AccessCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn invalidate_cache(&self) {
        self.cache().invalidate();
    }

    pub async fn validate_access(&self, project_id: EntityId) -> ProjectAccess {
        self.validate_many(&[project_id])
            .await
            .remove(&project_id)
            .unwrap_or_else(|| ProjectAccess::not_found(project_id))
    }

    /// Check several projects with at most one storage lookup.
    ///
    /// Cached answers are served directly; the remaining ids are looked up
    /// together. If the lookup fails, every uncached id is reported invalid
    /// with the storage message and nothing is cached.
    pub async fn validate_many(&self, project_ids: &[EntityId]) -> HashMap<EntityId, ProjectAccess> {
        let mut results = HashMap::with_capacity(project_ids.len());
        let mut misses: Vec<EntityId> = Vec::new();

        {
            let mut cache = self.cache();
            if cache.is_expired() {
                tracing::debug!(entries = cache.len(), "Project access cache expired");
                cache.invalidate();
            }
            let mut seen = HashSet::with_capacity(project_ids.len());
            for id in project_ids.iter().filter(|id| seen.insert(**id)) {
                match cache.get(id) {
                    Some(true) => {
                        tracing::debug!(project_id = %id, "Project access cache hit");
                        results.insert(*id, ProjectAccess::granted());
                    }
                    Some(false) => {
                        tracing::debug!(project_id = %id, "Project access cache hit");
                        results.insert(*id, ProjectAccess::not_found(*id));
                    }
                    None => misses.push(*id),
                }
            }
        }

        if misses.is_empty() {
            return results;
        }
        tracing::debug!(count = misses.len(), "Looking up project access");

        let filter = Filter::is_in(
            "id",
            misses.iter().map(|id| Value::String(id.to_string())).collect(),
        );
        let table = EntityKind::Project.table();
        let visible: HashSet<EntityId> = match self.store.select(table, &["id"], &[filter]).await {
            Ok(rows) => rows
                .iter()
                .filter_map(|row| row.get("id").and_then(Value::as_str))
                .filter_map(|id| id.parse().ok())
                .collect(),
            Err(err) => {
                tracing::warn!(error = %err, count = misses.len(), "Project access lookup failed");
                for id in misses {
                    results.insert(id, ProjectAccess::denied(err.message.clone()));
                }
                return results;
            }
        };

        let mut cache = self.cache();
        for id in misses {
            let found = visible.contains(&id);
            cache.insert(id, found);
            let access = if found {
                ProjectAccess::granted()
            } else {
                ProjectAccess::not_found(id)
            };
            results.insert(id, access);
        }
        results
    }

    /// Structural validation plus an access check on the referenced project.
    pub async fn validate_with_access(&self, suggestion: &UpdateSuggestion) -> AccessValidationResult {
        let base = validate_suggestion(suggestion);
        let mut project_validation_errors = Vec::new();

        match referenced_project_id(suggestion) {
            None => {}
            Some(Err(message)) => project_validation_errors.push(message),
            Some(Ok(id)) => {
                let access = self.validate_access(id).await;
                if !access.is_valid {
                    project_validation_errors.push(
                        access
                            .error
                            .unwrap_or_else(|| format!("Project {id} is not accessible")),
                    );
                }
            }
        }

        AccessValidationResult {
            base,
            project_validation_errors,
        }
    }
}

/// The project a suggestion touches, if any.
///
/// Project-scoped kinds reference it through `project_id` in their values; a
/// project update references itself. A reference that is not a UUID is an
/// error message.
pub fn referenced_project_id(suggestion: &UpdateSuggestion) -> Option<Result<EntityId, String>> {
    match suggestion.entity_type {
        EntityKind::Project => match suggestion.action {
            SuggestionAction::Update => suggestion.entity_id.map(Ok),
            SuggestionAction::Insert => None,
        },
        EntityKind::Property | EntityKind::ClientRequirement => {
            let raw = referenced_project(&suggestion.values)?;
            let parsed = raw.as_str().and_then(|s| s.trim().parse::<EntityId>().ok());
            Some(parsed.ok_or_else(|| format!("Invalid {PROJECT_ID_FIELD} '{}'", display_raw(raw))))
        }
    }
}

fn display_raw(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
