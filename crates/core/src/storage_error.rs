//! Storage failures and their user-facing categorization.
//!
//! Categories exist for display only; they never drive control flow.

use serde::{Deserialize, Serialize};

/// PostgreSQL SQLSTATE codes the pipeline distinguishes.
pub const SQLSTATE_INSUFFICIENT_PRIVILEGE: &str = "42501";
pub const SQLSTATE_FOREIGN_KEY_VIOLATION: &str = "23503";
pub const SQLSTATE_CHECK_VIOLATION: &str = "23514";
pub const SQLSTATE_UNIQUE_VIOLATION: &str = "23505";
pub const SQLSTATE_NOT_NULL_VIOLATION: &str = "23502";

/// A failed storage call, as reported by a [`crate::store::RecordStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct StoreError {
    /// SQLSTATE or adapter-specific code, when known.
    pub code: Option<String>,
    pub message: String,
}

impl StoreError {
    pub fn new(code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    /// An error without a code (connection loss, decode failure, ...).
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    pub fn kind(&self) -> StorageFailureKind {
        categorize(self)
    }
}

/// Display category of a storage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageFailureKind {
    AccessDenied,
    ForeignKeyViolation,
    CheckViolation,
    UniqueViolation,
    NotNullViolation,
    Unknown,
}

/// Classify a storage error by code, falling back to message wording.
pub fn categorize(err: &StoreError) -> StorageFailureKind {
    match err.code.as_deref() {
        Some(SQLSTATE_INSUFFICIENT_PRIVILEGE) => return StorageFailureKind::AccessDenied,
        Some(SQLSTATE_FOREIGN_KEY_VIOLATION) => return StorageFailureKind::ForeignKeyViolation,
        Some(SQLSTATE_CHECK_VIOLATION) => return StorageFailureKind::CheckViolation,
        Some(SQLSTATE_UNIQUE_VIOLATION) => return StorageFailureKind::UniqueViolation,
        Some(SQLSTATE_NOT_NULL_VIOLATION) => return StorageFailureKind::NotNullViolation,
        _ => {}
    }

    let msg = err.message.to_lowercase();
    if msg.contains("row-level security") || msg.contains("permission denied") {
        StorageFailureKind::AccessDenied
    } else if msg.contains("foreign key") {
        StorageFailureKind::ForeignKeyViolation
    } else if msg.contains("check constraint") {
        StorageFailureKind::CheckViolation
    } else if msg.contains("duplicate key") || msg.contains("unique constraint") {
        StorageFailureKind::UniqueViolation
    } else if msg.contains("not-null") || msg.contains("null value in column") {
        StorageFailureKind::NotNullViolation
    } else {
        StorageFailureKind::Unknown
    }
}

/// Render a storage failure for the end user.
///
/// `label` names the record being written (e.g. "property").
pub fn user_message(err: &StoreError, label: &str) -> String {
    match categorize(err) {
        StorageFailureKind::AccessDenied => {
            format!("Permission denied: you do not have access to modify this {label}")
        }
        StorageFailureKind::ForeignKeyViolation => {
            format!("Invalid reference: a record this {label} points to does not exist")
        }
        StorageFailureKind::CheckViolation => {
            format!("Invalid value: one of the {label} fields is not allowed ({})", err.message)
        }
        StorageFailureKind::UniqueViolation => {
            format!("Duplicate {label}: a record with the same unique value already exists")
        }
        StorageFailureKind::NotNullViolation => {
            format!("Missing value: a required {label} field was empty ({})", err.message)
        }
        StorageFailureKind::Unknown => err.message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_take_precedence() {
        let cases = [
            (SQLSTATE_INSUFFICIENT_PRIVILEGE, StorageFailureKind::AccessDenied),
            (SQLSTATE_FOREIGN_KEY_VIOLATION, StorageFailureKind::ForeignKeyViolation),
            (SQLSTATE_CHECK_VIOLATION, StorageFailureKind::CheckViolation),
            (SQLSTATE_UNIQUE_VIOLATION, StorageFailureKind::UniqueViolation),
            (SQLSTATE_NOT_NULL_VIOLATION, StorageFailureKind::NotNullViolation),
        ];
        for (code, kind) in cases {
            assert_eq!(categorize(&StoreError::new(Some(code), "x")), kind);
        }
    }

    #[test]
    fn row_level_security_wording_is_access_denied() {
        let err = StoreError::other(
            "new row violates row-level security policy for table \"properties\"",
        );
        assert_eq!(err.kind(), StorageFailureKind::AccessDenied);
    }

    #[test]
    fn unknown_failures_pass_the_raw_message() {
        let err = StoreError::other("connection reset by peer");
        assert_eq!(err.kind(), StorageFailureKind::Unknown);
        assert_eq!(user_message(&err, "property"), "connection reset by peer");
    }

    #[test]
    fn each_category_has_a_distinct_message() {
        let codes = [
            SQLSTATE_INSUFFICIENT_PRIVILEGE,
            SQLSTATE_FOREIGN_KEY_VIOLATION,
            SQLSTATE_CHECK_VIOLATION,
            SQLSTATE_UNIQUE_VIOLATION,
            SQLSTATE_NOT_NULL_VIOLATION,
        ];
        let messages: std::collections::HashSet<String> = codes
            .iter()
            .map(|c| user_message(&StoreError::new(Some(c), "detail"), "property"))
            .collect();
        assert_eq!(messages.len(), codes.len());
    }
}
