//! Entity registry.
//!
//! Every destination record type is a variant of [`EntityKind`]. All
//! per-type data (table, required insert fields, defaults, enumerated
//! columns, timestamp tracking) lives in one [`EntitySchema`] per kind and
//! is resolved through [`EntityKind::schema`], so adding a kind means adding
//! one variant and one schema entry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Entity type strings (as produced by the suggestion source).
pub const ENTITY_PROJECT: &str = "project";
pub const ENTITY_PROPERTY: &str = "property";
pub const ENTITY_CLIENT_REQUIREMENT: &str = "client_requirement";

/// All valid entity type strings.
pub const VALID_ENTITY_TYPES: &[&str] = &[ENTITY_PROJECT, ENTITY_PROPERTY, ENTITY_CLIENT_REQUIREMENT];

/// Project lifecycle statuses.
pub const PROJECT_STATUSES: &[&str] = &["active", "on_hold", "completed", "cancelled"];

/// Property pipeline statuses.
pub const PROPERTY_STATUSES: &[&str] = &[
    "new",
    "reviewing",
    "touring",
    "shortlisted",
    "negotiating",
    "rejected",
    "leased",
];

/// Market state of a property.
pub const PROPERTY_CURRENT_STATES: &[&str] =
    &["available", "under_contract", "leased", "off_market"];

/// Tour scheduling states of a property.
pub const PROPERTY_TOUR_STATUSES: &[&str] =
    &["not_scheduled", "requested", "scheduled", "completed", "cancelled"];

/// Client requirement priorities.
pub const REQUIREMENT_PRIORITIES: &[&str] = &["low", "medium", "high", "critical"];

/// Column referencing the owning project on child tables.
pub const PROJECT_ID_FIELD: &str = "project_id";

/// Column holding the fractional sort key on ordered tables.
pub const ORDER_KEY_FIELD: &str = "order_key";

pub const CREATED_AT_FIELD: &str = "created_at";
pub const UPDATED_AT_FIELD: &str = "updated_at";

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Static description of one destination table.
#[derive(Debug)]
pub struct EntitySchema {
    /// Table name in storage.
    pub table: &'static str,
    /// Human-readable singular label for messages.
    pub label: &'static str,
    /// Fields every insert must carry.
    pub required_fields: &'static [&'static str],
    /// Values injected into absent or null fields on insert.
    pub defaults: &'static [(&'static str, &'static str)],
    /// Closed-set columns and their allowed values.
    pub enum_fields: &'static [(&'static str, &'static [&'static str])],
    /// Whether the table has an `updated_at` column.
    pub tracks_updated_at: bool,
    /// Column referencing the owning project, if the entity is project-scoped.
    pub project_ref: Option<&'static str>,
}

impl EntitySchema {
    /// Allowed values for an enumerated column, if `field` is one.
    pub fn enum_values(&self, field: &str) -> Option<&'static [&'static str]> {
        self.enum_fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, values)| *values)
    }
}

static PROJECT_SCHEMA: EntitySchema = EntitySchema {
    table: "projects",
    label: "project",
    required_fields: &[],
    defaults: &[("status", "active")],
    enum_fields: &[("status", PROJECT_STATUSES)],
    tracks_updated_at: true,
    project_ref: None,
};

static PROPERTY_SCHEMA: EntitySchema = EntitySchema {
    table: "properties",
    label: "property",
    required_fields: &[PROJECT_ID_FIELD, "name"],
    defaults: &[("status", "new"), ("current_state", "available")],
    enum_fields: &[
        ("status", PROPERTY_STATUSES),
        ("current_state", PROPERTY_CURRENT_STATES),
        ("tour_status", PROPERTY_TOUR_STATUSES),
    ],
    tracks_updated_at: true,
    project_ref: Some(PROJECT_ID_FIELD),
};

static CLIENT_REQUIREMENT_SCHEMA: EntitySchema = EntitySchema {
    table: "client_requirements",
    label: "client requirement",
    required_fields: &[PROJECT_ID_FIELD, "category", "requirement_text"],
    defaults: &[("priority", "medium")],
    enum_fields: &[("priority", REQUIREMENT_PRIORITIES)],
    tracks_updated_at: false,
    project_ref: Some(PROJECT_ID_FIELD),
};

// ---------------------------------------------------------------------------
// EntityKind
// ---------------------------------------------------------------------------

/// Closed set of record types a suggestion can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    Property,
    ClientRequirement,
}

impl EntityKind {
    /// Resolve the static schema for this kind.
    pub fn schema(self) -> &'static EntitySchema {
        match self {
            Self::Project => &PROJECT_SCHEMA,
            Self::Property => &PROPERTY_SCHEMA,
            Self::ClientRequirement => &CLIENT_REQUIREMENT_SCHEMA,
        }
    }

    pub fn table(self) -> &'static str {
        self.schema().table
    }

    /// Convert to the wire string value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => ENTITY_PROJECT,
            Self::Property => ENTITY_PROPERTY,
            Self::ClientRequirement => ENTITY_CLIENT_REQUIREMENT,
        }
    }
}

impl FromStr for EntityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ENTITY_PROJECT => Ok(Self::Project),
            ENTITY_PROPERTY => Ok(Self::Property),
            ENTITY_CLIENT_REQUIREMENT => Ok(Self::ClientRequirement),
            other => Err(CoreError::UnknownEntityType(format!(
                "'{other}'. Must be one of: {}",
                VALID_ENTITY_TYPES.join(", ")
            ))),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn every_kind_round_trips_through_its_string() {
        for kind in [
            EntityKind::Project,
            EntityKind::Property,
            EntityKind::ClientRequirement,
        ] {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_entity_type_is_rejected() {
        assert_matches!(
            "contact".parse::<EntityKind>(),
            Err(CoreError::UnknownEntityType(msg)) if msg.contains("client_requirement")
        );
    }

    #[test]
    fn defaults_only_name_enum_members() {
        for kind in [
            EntityKind::Project,
            EntityKind::Property,
            EntityKind::ClientRequirement,
        ] {
            let schema = kind.schema();
            for (field, value) in schema.defaults {
                if let Some(allowed) = schema.enum_values(field) {
                    assert!(allowed.contains(value), "{kind}.{field} default '{value}'");
                }
            }
        }
    }

    #[test]
    fn only_requirements_skip_updated_at() {
        assert!(EntityKind::Project.schema().tracks_updated_at);
        assert!(EntityKind::Property.schema().tracks_updated_at);
        assert!(!EntityKind::ClientRequirement.schema().tracks_updated_at);
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&EntityKind::ClientRequirement).unwrap();
        assert_eq!(json, "\"client_requirement\"");
    }
}
