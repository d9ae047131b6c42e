//! Error types for st-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// A statement inside a migration script failed (D003)
    #[error("[D003] {script} statement {statement} failed: {message}")]
    ScriptFailed {
        script: String,
        statement: usize,
        message: String,
    },

    /// Transaction management error (D004)
    #[error("[D004] Transaction failed: {0}")]
    TransactionError(String),

    /// Custom command without a registered handler (D005)
    #[error("[D005] No handler registered for custom command '#{0}'")]
    UnknownCommand(String),

    /// Mutex poisoned (D006)
    #[error("[D006] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Internal error (D007)
    #[error("[D007] Internal database error: {0}")]
    Internal(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        DbError::ExecutionError(err.to_string())
    }
}
