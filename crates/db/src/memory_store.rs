//! In-process implementation of the storage port.
//!
//! Tables are plain vectors of JSON rows. Rows can be seeded as hidden to
//! stand in for rows a row-level policy keeps from the caller, and failures
//! can be injected per table to exercise error paths. Every call is counted.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use leasetrack_core::storage_error::{StoreError, SQLSTATE_UNIQUE_VIOLATION};
use leasetrack_core::store::{Filter, RecordStore, StoreResult};
use leasetrack_core::types::Row;
use serde_json::Value;

/// Which port operation a counter or injected failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Select,
    Insert,
    Update,
}

#[derive(Debug, Clone)]
struct StoredRow {
    row: Row,
    visible: bool,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    table: String,
    op: StoreOp,
    /// Only writes whose payload has `column == value` fail; `None` fails all.
    when: Option<(String, Value)>,
    error: StoreError,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<String, Vec<StoredRow>>,
    calls: HashMap<(String, StoreOp), usize>,
    failures: Vec<InjectedFailure>,
}

impl MemoryState {
    fn count(&mut self, table: &str, op: StoreOp) {
        *self.calls.entry((table.to_string(), op)).or_default() += 1;
    }

    fn injected(&self, table: &str, op: StoreOp, payload: Option<&Row>) -> Option<StoreError> {
        self.failures
            .iter()
            .find(|f| {
                f.table == table
                    && f.op == op
                    && match (&f.when, payload) {
                        (None, _) => true,
                        (Some((column, value)), Some(row)) => row.get(column) == Some(value),
                        (Some(_), None) => false,
                    }
            })
            .map(|f| f.error.clone())
    }
}

/// [`RecordStore`] holding every table in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a row visible to the caller.
    pub fn seed(&self, table: &str, row: Row) {
        self.push_row(table, row, true);
    }

    /// Add a row that exists but is hidden from the caller.
    pub fn seed_hidden(&self, table: &str, row: Row) {
        self.push_row(table, row, false);
    }

    fn push_row(&self, table: &str, row: Row, visible: bool) {
        self.state()
            .tables
            .entry(table.to_string())
            .or_default()
            .push(StoredRow { row, visible });
    }

    /// Every row of `table` (visible or not), in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state()
            .tables
            .get(table)
            .map(|rows| rows.iter().map(|r| r.row.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of `op` calls made against `table`.
    pub fn calls(&self, table: &str, op: StoreOp) -> usize {
        self.state()
            .calls
            .get(&(table.to_string(), op))
            .copied()
            .unwrap_or(0)
    }

    /// Make every `op` call against `table` fail with `error`.
    pub fn fail_all(&self, table: &str, op: StoreOp, error: StoreError) {
        self.state().failures.push(InjectedFailure {
            table: table.to_string(),
            op,
            when: None,
            error,
        });
    }

    /// Make `op` writes against `table` fail when the payload has
    /// `column == value`.
    pub fn fail_writes_where(
        &self,
        table: &str,
        op: StoreOp,
        column: &str,
        value: Value,
        error: StoreError,
    ) {
        self.state().failures.push(InjectedFailure {
            table: table.to_string(),
            op,
            when: Some((column.to_string(), value)),
            error,
        });
    }

    /// Drop every injected failure.
    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn select(
        &self,
        table: &str,
        columns: &[&str],
        filters: &[Filter],
    ) -> StoreResult<Vec<Row>> {
        let mut state = self.state();
        state.count(table, StoreOp::Select);
        if let Some(err) = state.injected(table, StoreOp::Select, None) {
            return Err(err);
        }

        let rows = state
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.visible && filters.iter().all(|f| f.matches(&r.row)))
                    .map(|r| project_columns(&r.row, columns))
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> StoreResult<()> {
        let mut state = self.state();
        state.count(table, StoreOp::Insert);
        for row in &rows {
            if let Some(err) = state.injected(table, StoreOp::Insert, Some(row)) {
                return Err(err);
            }
        }

        let existing = state.tables.entry(table.to_string()).or_default();
        for row in &rows {
            let Some(id) = row.get("id").filter(|v| !v.is_null()) else {
                continue;
            };
            let clashes = existing.iter().any(|r| r.row.get("id") == Some(id))
                || rows.iter().filter(|r| r.get("id") == Some(id)).count() > 1;
            if clashes {
                return Err(StoreError::new(
                    Some(SQLSTATE_UNIQUE_VIOLATION),
                    format!("duplicate key value violates unique constraint \"{table}_pkey\""),
                ));
            }
        }

        existing.extend(rows.into_iter().map(|row| StoredRow { row, visible: true }));
        Ok(())
    }

    async fn update(&self, table: &str, values: Row, filters: &[Filter]) -> StoreResult<u64> {
        let mut state = self.state();
        state.count(table, StoreOp::Update);
        if let Some(err) = state.injected(table, StoreOp::Update, Some(&values)) {
            return Err(err);
        }
        if values.is_empty() {
            return Ok(0);
        }

        let mut changed = 0;
        if let Some(rows) = state.tables.get_mut(table) {
            for stored in rows
                .iter_mut()
                .filter(|r| r.visible && filters.iter().all(|f| f.matches(&r.row)))
            {
                for (column, value) in &values {
                    stored.row.insert(column.clone(), value.clone());
                }
                changed += 1;
            }
        }
        Ok(changed)
    }
}

fn project_columns(row: &Row, columns: &[&str]) -> Row {
    if columns.is_empty() {
        return row.clone();
    }
    columns
        .iter()
        .map(|c| (c.to_string(), row.get(*c).cloned().unwrap_or(Value::Null)))
        .collect()
}
