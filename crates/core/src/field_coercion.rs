//! Field coercion: raw suggested values to column-typed JSON values.
//!
//! Coercion is lenient by design of the review workflow: a value that cannot
//! be coerced becomes `null` instead of failing the whole suggestion.
//! Required-field checks happen earlier, in [`crate::entity_validation`].

use std::sync::OnceLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde_json::{Number, Value};

use crate::entity::EntityKind;

/// Columns stored as numbers.
pub const NUMERIC_FIELDS: &[&str] = &[
    "total_sqft",
    "available_sqft",
    "min_sqft",
    "max_sqft",
    "asking_rent",
    "rent_per_sqft",
    "monthly_rent",
    "annual_rent",
    "budget",
    "budget_min",
    "budget_max",
    "lease_term_months",
    "parking_spaces",
    "parking_ratio",
    "ceiling_height",
    "floor",
    "year_built",
    "headcount",
];

/// Soft-delete timestamp columns.
pub const SOFT_DELETE_FIELDS: &[&str] = &["deleted_at", "archived_at"];

const TRUE_STRINGS: &[&str] = &["true", "yes", "1"];
const FALSE_STRINGS: &[&str] = &["false", "no", "0"];

fn separator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s\-]+").expect("static regex"))
}

/// Coerce a raw suggested value for `field` on `kind` into its column type.
///
/// Rules are applied in order; the first that matches wins.
pub fn parse_field_value(field: &str, raw: &Value, kind: EntityKind) -> Value {
    if raw.is_null() {
        return Value::Null;
    }

    if NUMERIC_FIELDS.contains(&field) {
        return parse_number(raw).map(Value::Number).unwrap_or(Value::Null);
    }

    if raw.is_boolean() {
        return raw.clone();
    }

    if let Value::String(s) = raw {
        let lowered = s.trim().to_lowercase();
        if TRUE_STRINGS.contains(&lowered.as_str()) {
            return Value::Bool(true);
        }
        if FALSE_STRINGS.contains(&lowered.as_str()) {
            return Value::Bool(false);
        }
    }

    if let Some(allowed) = kind.schema().enum_values(field) {
        return raw
            .as_str()
            .and_then(|s| normalize_enum_value(s, allowed))
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null);
    }

    if SOFT_DELETE_FIELDS.contains(&field) {
        return raw
            .as_str()
            .and_then(parse_utc_timestamp)
            .map(|ts| Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
            .unwrap_or(Value::Null);
    }

    match raw {
        Value::String(s) => Value::String(s.trim().to_string()),
        other => Value::String(other.to_string()),
    }
}

/// Match `raw` against a closed set of values.
///
/// Tries an exact match, then a case-insensitive one, then one with runs of
/// whitespace and hyphens collapsed to `_`.
pub fn normalize_enum_value(raw: &str, allowed: &[&'static str]) -> Option<&'static str> {
    if let Some(exact) = allowed.iter().find(|v| **v == raw) {
        return Some(*exact);
    }

    let trimmed = raw.trim();
    if let Some(ci) = allowed.iter().find(|v| v.eq_ignore_ascii_case(trimmed)) {
        return Some(*ci);
    }

    let normalized = separator_regex().replace_all(trimmed, "_").to_lowercase();
    allowed
        .iter()
        .find(|v| v.to_lowercase() == normalized)
        .copied()
}

/// Parse a strict RFC 3339 instant carrying an explicit `Z` designator.
pub fn parse_utc_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if !trimmed.ends_with('Z') {
        return None;
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_number(raw: &Value) -> Option<Number> {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| *c != ',' && *c != '$')
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    }?;
    if !parsed.is_finite() {
        return None;
    }
    Number::from_f64(parsed)
}
