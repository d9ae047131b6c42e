//! Connection traits consumed by the migration engine

use crate::error::{DbError, DbResult};
use chrono::{DateTime, Utc};

/// A bound parameter or fetched column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    /// Integer value, or an error naming the column.
    pub fn as_i64(&self, column: &str) -> DbResult<i64> {
        match self {
            SqlValue::Int(v) => Ok(*v),
            SqlValue::Text(s) => s.trim().parse().map_err(|_| {
                DbError::Internal(format!("column {column}: expected integer, got '{s}'"))
            }),
            other => Err(DbError::Internal(format!(
                "column {column}: expected integer, got {other:?}"
            ))),
        }
    }

    /// Text value; NULL maps to an empty string.
    pub fn as_text(&self) -> String {
        match self {
            SqlValue::Null => String::new(),
            SqlValue::Int(v) => v.to_string(),
            SqlValue::Text(s) => s.clone(),
            SqlValue::Timestamp(ts) => ts.to_rfc3339(),
        }
    }

    /// Timestamp value, or an error naming the column.
    pub fn as_timestamp(&self, column: &str) -> DbResult<DateTime<Utc>> {
        match self {
            SqlValue::Timestamp(ts) => Ok(*ts),
            SqlValue::Text(s) => DateTime::parse_from_rfc3339(s)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|e| DbError::Internal(format!("column {column}: {e}"))),
            other => Err(DbError::Internal(format!(
                "column {column}: expected timestamp, got {other:?}"
            ))),
        }
    }
}

/// Synchronous database connection used for one migration invocation.
///
/// Auto-commit is the resting state; [`begin`](Self::begin) turns it off until
/// the next [`commit`](Self::commit) or [`rollback`](Self::rollback).
pub trait MigrationConnection {
    /// Database product name as reported by the driver, e.g. `duckdb`
    fn product_name(&self) -> &str;

    /// True when unquoted identifiers are stored upper case
    fn stores_upper_case_identifiers(&self) -> bool;

    /// Start a transaction (disable auto-commit)
    fn begin(&self) -> DbResult<()>;

    /// Commit the open transaction
    fn commit(&self) -> DbResult<()>;

    /// Roll back the open transaction; a no-op when none is open
    fn rollback(&self) -> DbResult<()>;

    /// True while a transaction is open
    fn in_transaction(&self) -> bool;

    /// Execute one or more statements without parameters
    fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Execute a single statement with positional `?` parameters
    fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize>;

    /// Run a query and return the first `columns` values of each row
    fn query_rows(&self, sql: &str, columns: usize) -> DbResult<Vec<Vec<SqlValue>>>;

    /// Check whether a table exists (current schema when `schema` is None)
    fn table_exists(&self, schema: Option<&str>, table: &str) -> DbResult<bool>;

    /// Create a schema if it does not exist
    fn create_schema_if_not_exists(&self, schema: &str) -> DbResult<()>;

    /// Make `schema` the default for unqualified names
    fn set_schema(&self, schema: &str) -> DbResult<()>;

    /// Close the connection, releasing its resources
    fn close(self: Box<Self>) -> DbResult<()>;
}

/// Hands out connections, e.g. from a pool or a driver configuration.
pub trait ConnectionProvider {
    /// Acquire a connection owned by the caller
    fn connect(&self) -> DbResult<Box<dyn MigrationConnection>>;
}
