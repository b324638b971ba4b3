//! PostgreSQL implementation of the storage port.
//!
//! Values travel as JSONB and are expanded with `jsonb_populate_record(set)`
//! against the destination table's row type, so column types always come
//! from the table definition. Table and column names are validated and
//! quoted before being spliced into SQL; all values are bound.
//!
//! Row-level authorization is whatever the pool's database role is subject
//! to: rows hidden by policy are simply not returned or updated.

use async_trait::async_trait;
use leasetrack_core::storage_error::StoreError;
use leasetrack_core::store::{Filter, RecordStore, StoreResult};
use leasetrack_core::types::Row;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

/// Adapter code reported for rejected identifiers.
pub const CODE_INVALID_IDENTIFIER: &str = "invalid_identifier";

/// [`RecordStore`] backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn select(
        &self,
        table: &str,
        columns: &[&str],
        filters: &[Filter],
    ) -> StoreResult<Vec<Row>> {
        let table = quote_ident(table)?;
        for column in columns {
            quote_ident(column)?;
        }

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT to_jsonb(t) FROM {table} t"));
        push_filters(&mut qb, filters)?;

        let rows: Vec<Json<Value>> = qb
            .build_query_scalar::<Json<Value>>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|Json(value)| match value {
                Value::Object(row) => Some(project_columns(row, columns)),
                _ => None,
            })
            .collect())
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> StoreResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let table = quote_ident(table)?;
        let column_list = quoted_column_list(rows.iter())?;

        let payload = Value::Array(rows.into_iter().map(Value::Object).collect());
        let query = format!(
            "INSERT INTO {table} ({column_list}) \
             SELECT {column_list} FROM jsonb_populate_recordset(NULL::{table}, $1)"
        );
        let result = sqlx::query(&query)
            .bind(Json(payload))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        tracing::debug!(%table, rows = result.rows_affected(), "Inserted rows");
        Ok(())
    }

    async fn update(&self, table: &str, values: Row, filters: &[Filter]) -> StoreResult<u64> {
        if values.is_empty() {
            return Ok(0);
        }
        let table = quote_ident(table)?;
        let column_list = quoted_column_list(std::iter::once(&values))?;
        let target = if values.len() == 1 {
            column_list.clone()
        } else {
            format!("({column_list})")
        };

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "UPDATE {table} AS t SET {target} = \
             (SELECT {column_list} FROM jsonb_populate_record(NULL::{table}, "
        ));
        qb.push_bind(Json(Value::Object(values)));
        qb.push("))");
        push_filters(&mut qb, filters)?;

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}

/// Append `WHERE` clauses for `filters`, comparing on the text form of the
/// column so any column type can be matched against JSON values.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &[Filter]) -> StoreResult<()> {
    for (i, filter) in filters.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        let column = quote_ident(filter.column())?;
        match filter {
            Filter::Eq(_, Value::Null) => {
                qb.push(format!("t.{column} IS NULL"));
            }
            Filter::Eq(_, value) => {
                qb.push(format!("t.{column}::text = "));
                qb.push_bind(text_value(value));
            }
            Filter::In(_, values) => {
                let texts: Vec<String> = values
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(text_value)
                    .collect();
                qb.push(format!("t.{column}::text = ANY("));
                qb.push_bind(texts);
                qb.push(")");
            }
        }
    }
    Ok(())
}

fn text_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Union of the keys of `rows`, in first-seen order, validated and quoted.
fn quoted_column_list<'a>(rows: impl Iterator<Item = &'a Row>) -> StoreResult<String> {
    let mut seen: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !seen.contains(&key.as_str()) {
                seen.push(key);
            }
        }
    }
    let quoted = seen
        .into_iter()
        .map(quote_ident)
        .collect::<StoreResult<Vec<_>>>()?;
    Ok(quoted.join(", "))
}

fn project_columns(mut row: Row, columns: &[&str]) -> Row {
    if columns.is_empty() {
        return row;
    }
    columns
        .iter()
        .map(|c| (c.to_string(), row.remove(*c).unwrap_or(Value::Null)))
        .collect()
}

/// Validate a lower-case SQL identifier and return it double-quoted.
pub fn quote_ident(name: &str) -> StoreResult<String> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid_start && valid_rest && name.len() <= 63 {
        Ok(format!("\"{name}\""))
    } else {
        Err(StoreError::new(
            Some(CODE_INVALID_IDENTIFIER),
            format!("Invalid column or table name '{name}'"),
        ))
    }
}

/// Convert a sqlx error into a port error, keeping the SQLSTATE code.
pub fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) => {
            StoreError::new(db_err.code().as_deref(), db_err.message().to_string())
        }
        other => {
            tracing::error!(error = %other, "Database error");
            StoreError::other(other.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("order_key").unwrap(), "\"order_key\"");
        assert_eq!(quote_ident("_x1").unwrap(), "\"_x1\"");
    }

    #[test]
    fn unsafe_identifiers_are_rejected() {
        for bad in ["", "Name", "1col", "name; DROP TABLE projects", "a\"b", "col-name"] {
            let err = quote_ident(bad).unwrap_err();
            assert_eq!(err.code.as_deref(), Some(CODE_INVALID_IDENTIFIER), "{bad:?}");
        }
    }

    #[test]
    fn column_list_is_union_in_first_seen_order() {
        let rows = [
            row(&[("id", json!("1")), ("name", json!("A"))]),
            row(&[("id", json!("2")), ("order_key", json!("a0"))]),
        ];
        let list = quoted_column_list(rows.iter()).unwrap();
        assert_eq!(list, "\"id\", \"name\", \"order_key\"");
    }

    #[test]
    fn projection_keeps_requested_columns_only() {
        let r = row(&[("id", json!("1")), ("name", json!("A"))]);
        let projected = project_columns(r, &["id", "missing"]);
        assert_eq!(projected.len(), 2);
        assert_eq!(projected["id"], json!("1"));
        assert_eq!(projected["missing"], Value::Null);
    }

    #[test]
    fn filters_render_as_text_comparisons() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT to_jsonb(t) FROM \"properties\" t");
        push_filters(
            &mut qb,
            &[
                Filter::eq("project_id", "p1"),
                Filter::is_in("id", vec![json!("a"), json!("b")]),
                Filter::eq("deleted_at", Value::Null),
            ],
        )
        .unwrap();
        assert_eq!(
            qb.sql(),
            "SELECT to_jsonb(t) FROM \"properties\" t WHERE t.\"project_id\"::text = $1 \
             AND t.\"id\"::text = ANY($2) AND t.\"deleted_at\" IS NULL"
        );
    }

    #[test]
    fn non_database_errors_have_no_code() {
        let err = map_sqlx_error(sqlx::Error::RowNotFound);
        assert!(err.code.is_none());
    }
}
