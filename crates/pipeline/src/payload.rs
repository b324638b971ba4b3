//! Write payloads built from suggestions.
//!
//! Every value goes through [`parse_field_value`]. A field whose non-null
//! raw value coerces to null is left out of the payload so a bad suggestion
//! never clears a stored value.

use chrono::SecondsFormat;
use leasetrack_core::entity::{CREATED_AT_FIELD, UPDATED_AT_FIELD};
use leasetrack_core::entity_validation::apply_default_values;
use leasetrack_core::field_coercion::parse_field_value;
use leasetrack_core::suggestion::UpdateSuggestion;
use leasetrack_core::types::{Row, Timestamp};
use serde_json::Value;

/// Row to insert for an insert suggestion: defaults, coercion, timestamps.
pub fn build_insert_payload(suggestion: &UpdateSuggestion, now: Timestamp) -> Row {
    let values = apply_default_values(suggestion);
    let mut row = coerce_values(suggestion, &values);

    let stamp = timestamp_value(now);
    row.insert(CREATED_AT_FIELD.to_string(), stamp.clone());
    if suggestion.entity_type.schema().tracks_updated_at {
        row.insert(UPDATED_AT_FIELD.to_string(), stamp);
    }
    row
}

/// Column changes for an update suggestion.
///
/// The primary key is never part of an update.
pub fn build_update_payload(suggestion: &UpdateSuggestion, now: Timestamp) -> Row {
    let mut row = coerce_values(suggestion, &suggestion.values);
    row.remove("id");
    row.remove(CREATED_AT_FIELD);

    if suggestion.entity_type.schema().tracks_updated_at {
        row.insert(UPDATED_AT_FIELD.to_string(), timestamp_value(now));
    } else {
        row.remove(UPDATED_AT_FIELD);
    }
    row
}

fn coerce_values(suggestion: &UpdateSuggestion, values: &Row) -> Row {
    let kind = suggestion.entity_type;
    let mut row = Row::new();
    for (field, raw) in values {
        let parsed = parse_field_value(field, raw, kind);
        if parsed.is_null() && !raw.is_null() {
            tracing::warn!(
                suggestion_id = %suggestion.id,
                entity_type = %kind,
                field = %field,
                value = %raw,
                "Dropping value that could not be coerced"
            );
            continue;
        }
        row.insert(field.clone(), parsed);
    }
    row
}

fn timestamp_value(now: Timestamp) -> Value {
    Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true))
}
