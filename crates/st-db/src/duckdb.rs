//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::{ConnectionProvider, MigrationConnection, SqlValue};
use chrono::DateTime;
use duckdb::types::{TimeUnit, Value};
use duckdb::Connection;
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// DuckDB connection used for one migration invocation
pub struct DuckDbConnection {
    conn: Connection,
    in_transaction: Cell<bool>,
}

impl DuckDbConnection {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self::from_connection(conn))
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    /// Wrap an already open DuckDB connection
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            in_transaction: Cell::new(false),
        }
    }

    /// Borrow the underlying DuckDB connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl MigrationConnection for DuckDbConnection {
    fn product_name(&self) -> &str {
        "DuckDB"
    }

    fn stores_upper_case_identifiers(&self) -> bool {
        false
    }

    fn begin(&self) -> DbResult<()> {
        self.conn
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;
        self.in_transaction.set(true);
        Ok(())
    }

    fn commit(&self) -> DbResult<()> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| DbError::TransactionError(format!("COMMIT failed: {e}")))?;
        self.in_transaction.set(false);
        Ok(())
    }

    fn rollback(&self) -> DbResult<()> {
        if !self.in_transaction.get() {
            return Ok(());
        }
        self.in_transaction.set(false);
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| DbError::TransactionError(format!("ROLLBACK failed: {e}")))
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction.get()
    }

    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.conn.execute_batch(sql).map_err(DbError::from)
    }

    fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
        let values: Vec<Value> = params.iter().map(to_duckdb_value).collect();
        self.conn
            .execute(sql, duckdb::params_from_iter(values))
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))
    }

    fn query_rows(&self, sql: &str, columns: usize) -> DbResult<Vec<Vec<SqlValue>>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns);
            for i in 0..columns {
                let value: Value = row.get(i)?;
                values.push(from_duckdb_value(value));
            }
            result.push(values);
        }
        Ok(result)
    }

    fn table_exists(&self, schema: Option<&str>, table: &str) -> DbResult<bool> {
        let count: i64 = match schema {
            Some(schema) => self.conn.query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
                duckdb::params![schema, table],
                |row| row.get(0),
            ),
            None => self.conn.query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = current_schema() AND table_name = ?",
                duckdb::params![table],
                |row| row.get(0),
            ),
        }
        .map_err(|e| DbError::ExecutionError(e.to_string()))?;
        Ok(count > 0)
    }

    fn create_schema_if_not_exists(&self, schema: &str) -> DbResult<()> {
        self.execute_batch(&format!("CREATE SCHEMA IF NOT EXISTS {}", schema))
    }

    fn set_schema(&self, schema: &str) -> DbResult<()> {
        self.execute_batch(&format!("SET schema = '{}'", schema.replace('\'', "''")))
    }

    fn close(self: Box<Self>) -> DbResult<()> {
        if self.in_transaction.get() {
            log::warn!("Closing DuckDB connection with an open transaction; it will be discarded");
        }
        self.conn
            .close()
            .map_err(|(_, e)| DbError::ConnectionError(format!("close failed: {e}")))
    }
}

fn to_duckdb_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Int(v) => Value::BigInt(*v),
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Timestamp(ts) => Value::Timestamp(TimeUnit::Microsecond, ts.timestamp_micros()),
    }
}

fn from_duckdb_value(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Boolean(b) => SqlValue::Int(i64::from(b)),
        Value::TinyInt(v) => SqlValue::Int(i64::from(v)),
        Value::SmallInt(v) => SqlValue::Int(i64::from(v)),
        Value::Int(v) => SqlValue::Int(i64::from(v)),
        Value::BigInt(v) => SqlValue::Int(v),
        Value::UTinyInt(v) => SqlValue::Int(i64::from(v)),
        Value::USmallInt(v) => SqlValue::Int(i64::from(v)),
        Value::UInt(v) => SqlValue::Int(i64::from(v)),
        Value::Text(s) => SqlValue::Text(s),
        Value::Timestamp(unit, v) => {
            let micros = match unit {
                TimeUnit::Second => v.saturating_mul(1_000_000),
                TimeUnit::Millisecond => v.saturating_mul(1_000),
                TimeUnit::Microsecond => v,
                TimeUnit::Nanosecond => v / 1_000,
            };
            match DateTime::from_timestamp_micros(micros) {
                Some(ts) => SqlValue::Timestamp(ts),
                None => SqlValue::Null,
            }
        }
        other => SqlValue::Text(format!("{other:?}")),
    }
}

/// Provider that opens a fresh connection per invocation from a path
#[derive(Debug, Clone)]
pub struct DuckDbDriver {
    path: String,
}

impl DuckDbDriver {
    /// Create a driver for a database path (or `:memory:`)
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl ConnectionProvider for DuckDbDriver {
    fn connect(&self) -> DbResult<Box<dyn MigrationConnection>> {
        Ok(Box::new(DuckDbConnection::new(&self.path)?))
    }
}

/// Provider handing out connections that share one database instance.
///
/// Useful for in-memory databases, which otherwise vanish with their
/// connection.
pub struct DuckDbPool {
    root: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl DuckDbPool {
    /// Create a pool over a new in-memory database
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            root: Mutex::new(conn),
            path: None,
        })
    }

    /// Create a pool over a database file
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self {
            root: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Acquire a concrete DuckDB connection to the shared database
    pub fn get(&self) -> DbResult<DuckDbConnection> {
        let root = self
            .root
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        let conn = root.try_clone().map_err(|e| {
            let target = self
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| ":memory:".to_string());
            DbError::ConnectionError(format!("{e}: {target}"))
        })?;
        Ok(DuckDbConnection::from_connection(conn))
    }
}

impl ConnectionProvider for DuckDbPool {
    fn connect(&self) -> DbResult<Box<dyn MigrationConnection>> {
        Ok(Box::new(self.get()?))
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
