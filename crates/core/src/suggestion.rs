//! Suggestion and batch-result types.
//!
//! A suggestion is a proposed change produced upstream from free text. It is
//! immutable once created; approval state is tracked by the caller, keyed by
//! [`UpdateSuggestion::id`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::entity::EntityKind;
use crate::types::{EntityId, Row};

/// Whether a suggestion modifies an existing record or creates a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionAction {
    Update,
    Insert,
}

impl SuggestionAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Insert => "insert",
        }
    }
}

/// A proposed change to one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateSuggestion {
    pub id: String,
    pub entity_type: EntityKind,
    pub action: SuggestionAction,
    /// Required for updates, absent for inserts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<EntityId>,
    #[serde(default)]
    pub entity_name: String,
    /// Destination column name to raw value.
    #[serde(default)]
    pub values: Row,
    #[serde(default)]
    pub reasoning: String,
}

impl UpdateSuggestion {
    /// Label used in user-facing messages.
    pub fn display_name(&self) -> &str {
        if self.entity_name.trim().is_empty() {
            self.entity_type.schema().label
        } else {
            &self.entity_name
        }
    }
}

/// Aggregate outcome of applying a batch of suggestions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// `true` iff no item failed.
    pub success: bool,
    pub processed_count: usize,
    pub failed_count: usize,
    /// Human-readable failure descriptions in processing order.
    pub errors: Vec<String>,
}

impl BatchResult {
    /// Result for an empty batch.
    pub fn empty() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn record_processed(&mut self, count: usize) {
        self.processed_count += count;
    }

    pub fn record_failed(&mut self, count: usize, error: impl Into<String>) {
        self.failed_count += count;
        self.errors.push(error.into());
    }

    /// Number of items accounted for so far.
    pub fn settled_count(&self) -> usize {
        self.processed_count + self.failed_count
    }

    /// Fix up `success` once every item is accounted for.
    pub fn finish(mut self) -> Self {
        self.success = self.failed_count == 0;
        self
    }
}

/// Make suggestion ids unique within a batch.
///
/// The first occurrence of an id keeps it; later clashes receive the
/// smallest `-N` suffix (N >= 2) not already used anywhere in the batch.
pub fn dedupe_suggestion_ids(suggestions: Vec<UpdateSuggestion>) -> Vec<UpdateSuggestion> {
    let mut taken: HashSet<String> = suggestions.iter().map(|s| s.id.clone()).collect();
    let mut seen: HashSet<String> = HashSet::with_capacity(suggestions.len());

    suggestions
        .into_iter()
        .map(|mut suggestion| {
            if !seen.insert(suggestion.id.clone()) {
                let mut n = 2;
                let unique = loop {
                    let candidate = format!("{}-{n}", suggestion.id);
                    if !taken.contains(&candidate) {
                        break candidate;
                    }
                    n += 1;
                };
                taken.insert(unique.clone());
                seen.insert(unique.clone());
                suggestion.id = unique;
            }
            suggestion
        })
        .collect()
}
