//! Storage port.
//!
//! The pipeline reaches persisted records only through [`RecordStore`].
//! Implementations enforce the caller's row-level authorization themselves:
//! a row the caller may not read is simply absent from results.

use async_trait::async_trait;
use serde_json::Value;

use crate::storage_error::StoreError;
use crate::types::Row;

pub type StoreResult<T> = Result<T, StoreError>;

/// A predicate on one column.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`
    Eq(String, Value),
    /// `column IN (values)`
    In(String, Vec<Value>),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::Eq(column.to_string(), value.into())
    }

    pub fn is_in(column: &str, values: Vec<Value>) -> Self {
        Self::In(column.to_string(), values)
    }

    pub fn column(&self) -> &str {
        match self {
            Self::Eq(column, _) | Self::In(column, _) => column,
        }
    }

    /// Whether `row` satisfies this predicate (values compared as JSON).
    pub fn matches(&self, row: &Row) -> bool {
        let cell = row.get(self.column()).unwrap_or(&Value::Null);
        match self {
            Self::Eq(_, value) => cell == value,
            Self::In(_, values) => values.contains(cell),
        }
    }
}

/// Record-oriented storage collaborator, one named table per call.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch `columns` of every visible row in `table` matching all `filters`.
    async fn select(&self, table: &str, columns: &[&str], filters: &[Filter])
        -> StoreResult<Vec<Row>>;

    /// Insert one or more rows as a single write.
    async fn insert(&self, table: &str, rows: Vec<Row>) -> StoreResult<()>;

    /// Set `values` on every visible row matching all `filters`.
    ///
    /// Returns the number of rows changed. An empty `values` changes nothing
    /// and returns 0 without consulting the filters.
    async fn update(&self, table: &str, values: Row, filters: &[Filter]) -> StoreResult<u64>;

    /// Point lookup by primary key.
    async fn find_by_id(&self, table: &str, id: &str, columns: &[&str]) -> StoreResult<Option<Row>> {
        let rows = self
            .select(table, columns, &[Filter::eq("id", id.to_string())])
            .await?;
        Ok(rows.into_iter().next())
    }
}
