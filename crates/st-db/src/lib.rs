//! st-db - Database abstraction layer for Stratum
//!
//! This crate provides the connection traits the migration engine runs
//! against, a DuckDB implementation of them, dialect facts for the history
//! table, and the script executor.

pub mod duckdb;
pub mod error;
pub mod platform;
pub mod script;
pub mod traits;

pub use duckdb::{DuckDbConnection, DuckDbDriver, DuckDbPool};
pub use error::{DbError, DbResult};
pub use script::{
    split_statements, CommandHandlers, CustomCommandHandler, ScriptExecutor, Statement,
    StatementExecutor,
};
pub use traits::{ConnectionProvider, MigrationConnection, SqlValue};
