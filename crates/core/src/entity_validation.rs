//! Structural validation of suggestions, pure logic, no storage access.
//!
//! Updates are partial and always pass this layer. Inserts must carry every
//! required field of their entity kind and satisfy the kind's structural
//! rules. Project access is checked separately by the pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{EntityKind, PROJECT_ID_FIELD};
use crate::field_coercion::normalize_enum_value;
use crate::suggestion::{SuggestionAction, UpdateSuggestion};
use crate::types::Row;

/// Minimum length below which requirement text is flagged.
pub const MIN_REQUIREMENT_TEXT_LENGTH: usize = 10;

pub const RULE_REQUIRED: &str = "required";
pub const RULE_ENUM_VALUES: &str = "enum_values";
pub const RULE_MIN_LENGTH: &str = "min_length";
pub const RULE_RECOMMENDED: &str = "recommended";

/// Aggregated result of validating one suggestion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<FieldViolation>,
    pub warnings: Vec<FieldViolation>,
}

impl ValidationResult {
    /// Error messages, in order.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.message.clone()).collect()
    }
}

/// A single field-level rule violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub rule_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl FieldViolation {
    fn new(field: &str, rule_type: &str, message: String, value: Option<&Value>) -> Self {
        Self {
            field: field.to_string(),
            rule_type: rule_type.to_string(),
            message,
            value: value.cloned(),
        }
    }
}

/// Validate a suggestion's structure.
pub fn validate_suggestion(suggestion: &UpdateSuggestion) -> ValidationResult {
    if suggestion.action == SuggestionAction::Update {
        return ValidationResult {
            is_valid: true,
            ..ValidationResult::default()
        };
    }

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let values = &suggestion.values;
    let schema = suggestion.entity_type.schema();

    for field in schema.required_fields {
        if is_blank(values.get(*field)) {
            errors.push(FieldViolation::new(
                field,
                RULE_REQUIRED,
                format!("Missing required field: {field}"),
                values.get(*field),
            ));
        }
    }

    match suggestion.entity_type {
        EntityKind::Property => {
            check_enum(values, suggestion.entity_type, "status", &mut errors);
            check_enum(values, suggestion.entity_type, "current_state", &mut errors);
            if is_blank(values.get("address")) {
                warnings.push(FieldViolation::new(
                    "address",
                    RULE_RECOMMENDED,
                    "Property has no address".to_string(),
                    None,
                ));
            }
        }
        EntityKind::ClientRequirement => {
            for field in ["category", "requirement_text"] {
                let is_string = matches!(values.get(field), Some(Value::String(_)));
                if !is_string && !is_blank(values.get(field)) {
                    errors.push(FieldViolation::new(
                        field,
                        RULE_REQUIRED,
                        format!("{field} must be a non-empty string"),
                        values.get(field),
                    ));
                }
            }
            if let Some(Value::String(text)) = values.get("requirement_text") {
                let len = text.trim().chars().count();
                if len > 0 && len < MIN_REQUIREMENT_TEXT_LENGTH {
                    warnings.push(FieldViolation::new(
                        "requirement_text",
                        RULE_MIN_LENGTH,
                        format!(
                            "Requirement text is very short ({len} characters, recommended at least {MIN_REQUIREMENT_TEXT_LENGTH})"
                        ),
                        values.get("requirement_text"),
                    ));
                }
            }
        }
        EntityKind::Project => {
            if is_blank(values.get("title")) && is_blank(values.get("name")) {
                errors.push(FieldViolation::new(
                    "title",
                    RULE_REQUIRED,
                    "Project must have a title or name".to_string(),
                    None,
                ));
            }
            check_enum(values, suggestion.entity_type, "status", &mut errors);
        }
    }

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Merge schema defaults into an insert suggestion's values.
///
/// Only absent or null fields are filled, and a fresh `id` is generated when
/// none was supplied. Updates are partial patches and come back unchanged.
pub fn apply_default_values(suggestion: &UpdateSuggestion) -> Row {
    let mut values = suggestion.values.clone();
    if suggestion.action == SuggestionAction::Update {
        return values;
    }

    for (field, default) in suggestion.entity_type.schema().defaults {
        let missing = values.get(*field).map_or(true, Value::is_null);
        if missing {
            values.insert(field.to_string(), Value::String(default.to_string()));
        }
    }

    if is_blank(values.get("id")) {
        values.insert(
            "id".to_string(),
            Value::String(uuid::Uuid::now_v7().to_string()),
        );
    }

    values
}

/// The project a suggestion's values point at, if any (raw, unparsed).
pub fn referenced_project(values: &Row) -> Option<&Value> {
    values.get(PROJECT_ID_FIELD).filter(|v| !v.is_null())
}

fn check_enum(values: &Row, kind: EntityKind, field: &str, errors: &mut Vec<FieldViolation>) {
    let Some(allowed) = kind.schema().enum_values(field) else {
        return;
    };
    let value = match values.get(field) {
        Some(v) if !v.is_null() => v,
        _ => return,
    };
    let ok = value
        .as_str()
        .is_some_and(|s| normalize_enum_value(s, allowed).is_some());
    if !ok {
        errors.push(FieldViolation::new(
            field,
            RULE_ENUM_VALUES,
            format!(
                "Invalid {field} '{}'. Must be one of: {}",
                display_value(value),
                allowed.join(", ")
            ),
            Some(value),
        ));
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn insert(kind: EntityKind, values: Value) -> UpdateSuggestion {
        UpdateSuggestion {
            id: "s1".to_string(),
            entity_type: kind,
            action: SuggestionAction::Insert,
            entity_id: None,
            entity_name: "Test".to_string(),
            values: values.as_object().cloned().unwrap_or_default(),
            reasoning: String::new(),
        }
    }

    const PROJECT: &str = "0190b3c4-1111-7000-8000-000000000001";

    #[test]
    fn updates_are_always_valid() {
        let mut s = insert(EntityKind::Property, json!({ "status": "bogus" }));
        s.action = SuggestionAction::Update;
        let result = validate_suggestion(&s);
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn property_insert_without_project_id_names_the_field() {
        let s = insert(EntityKind::Property, json!({ "name": "Tower A", "address": "1 Main" }));
        let result = validate_suggestion(&s);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "project_id");
        assert!(result.errors[0].message.contains("project_id"));
    }

    #[test]
    fn blank_strings_count_as_missing() {
        let s = insert(
            EntityKind::Property,
            json!({ "project_id": PROJECT, "name": "   ", "address": "1 Main" }),
        );
        let result = validate_suggestion(&s);
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].field, "name");
    }

    #[test]
    fn property_enum_error_lists_allowed_values() {
        let s = insert(
            EntityKind::Property,
            json!({ "project_id": PROJECT, "name": "Tower A", "address": "1 Main", "status": "bogus" }),
        );
        let result = validate_suggestion(&s);
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].rule_type, RULE_ENUM_VALUES);
        assert!(result.errors[0]
            .message
            .contains("new, reviewing, touring, shortlisted, negotiating, rejected, leased"));
    }

    #[test]
    fn enum_values_are_matched_leniently() {
        let s = insert(
            EntityKind::Property,
            json!({ "project_id": PROJECT, "name": "Tower A", "address": "1 Main", "current_state": "Off Market" }),
        );
        assert!(validate_suggestion(&s).is_valid);
    }

    #[test]
    fn property_current_state_is_checked() {
        let s = insert(
            EntityKind::Property,
            json!({ "project_id": PROJECT, "name": "Tower A", "address": "1 Main", "current_state": "gone" }),
        );
        let result = validate_suggestion(&s);
        assert_eq!(result.errors[0].field, "current_state");
    }

    #[test]
    fn property_missing_address_is_only_a_warning() {
        let s = insert(EntityKind::Property, json!({ "project_id": PROJECT, "name": "Tower A" }));
        let result = validate_suggestion(&s);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].field, "address");
    }

    #[test]
    fn short_requirement_text_warns() {
        let s = insert(
            EntityKind::ClientRequirement,
            json!({ "project_id": PROJECT, "category": "space", "requirement_text": "5 kW." }),
        );
        let result = validate_suggestion(&s);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].rule_type, RULE_MIN_LENGTH);
    }

    #[test]
    fn requirement_needs_category_text_and_project() {
        let s = insert(EntityKind::ClientRequirement, json!({ "category": "" }));
        let result = validate_suggestion(&s);
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["project_id", "category", "requirement_text"]);
    }

    #[test]
    fn requirement_text_must_be_a_string() {
        let s = insert(
            EntityKind::ClientRequirement,
            json!({ "project_id": PROJECT, "category": "space", "requirement_text": 42 }),
        );
        let result = validate_suggestion(&s);
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].field, "requirement_text");
    }

    #[test]
    fn project_needs_title_or_name() {
        let result = validate_suggestion(&insert(EntityKind::Project, json!({})));
        assert!(!result.is_valid);

        let result = validate_suggestion(&insert(EntityKind::Project, json!({ "name": "HQ search" })));
        assert!(result.is_valid);

        let result = validate_suggestion(&insert(EntityKind::Project, json!({ "title": "HQ search" })));
        assert!(result.is_valid);
    }

    #[test]
    fn project_status_must_be_known() {
        let result = validate_suggestion(&insert(
            EntityKind::Project,
            json!({ "title": "HQ search", "status": "paused" }),
        ));
        assert!(!result.is_valid);
        assert!(result.errors[0].message.contains("active, on_hold, completed, cancelled"));
    }

    #[test]
    fn defaults_fill_absent_and_null_fields_only() {
        let s = insert(
            EntityKind::Property,
            json!({ "project_id": PROJECT, "name": "Tower A", "status": "touring", "current_state": null }),
        );
        let values = apply_default_values(&s);
        assert_eq!(values["status"], json!("touring"));
        assert_eq!(values["current_state"], json!("available"));
    }

    #[test]
    fn inserts_get_a_generated_id() {
        let s = insert(EntityKind::Project, json!({ "title": "HQ search" }));
        let values = apply_default_values(&s);
        let id = values["id"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
        assert_eq!(values["status"], json!("active"));
    }

    #[test]
    fn supplied_ids_are_kept() {
        let s = insert(EntityKind::Project, json!({ "id": PROJECT, "title": "HQ search" }));
        let values = apply_default_values(&s);
        assert_eq!(values["id"], json!(PROJECT));
    }

    #[test]
    fn updates_get_neither_defaults_nor_ids() {
        let mut s = insert(EntityKind::Project, json!({ "title": "Renamed" }));
        s.action = SuggestionAction::Update;
        let values = apply_default_values(&s);
        assert!(values.get("id").is_none());
        assert!(values.get("status").is_none());
    }
}
