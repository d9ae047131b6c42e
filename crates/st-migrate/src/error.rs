//! Error types for the migration engine.

use st_core::CoreError;
use st_db::DbError;
use thiserror::Error;

/// Migration engine errors.
#[derive(Error, Debug)]
pub enum MigrationError {
    /// A migration ran ahead of its predecessor (MIG001).
    #[error("[MIG001] Migration {version} requires prior migration {prior} which has not been run")]
    DependencyViolation { version: String, prior: String },

    /// An applied migration was edited after it ran (MIG002).
    #[error("[MIG002] Checksum mismatch on migration {location} (version {version})")]
    ChecksumMismatch { version: String, location: String },

    /// Executing a migration script failed (MIG003).
    #[error("[MIG003] Migration {version} failed")]
    ScriptFailed {
        version: String,
        #[source]
        source: DbError,
    },

    /// A deferred non-transactional script failed after commit (MIG004).
    #[error("[MIG004] Non-transactional migration {version} failed after commit")]
    NonTransactionalFailed {
        version: String,
        #[source]
        source: DbError,
    },

    /// Connection or history-table failure (MIG005).
    #[error("[MIG005] Migration database error")]
    Database(#[from] DbError),

    /// Configuration, discovery or template failure (MIG006).
    #[error("[MIG006] Migration setup failed")]
    Core(#[from] CoreError),

    /// A history row could not be read (MIG007).
    #[error("[MIG007] Corrupt migration history: {0}")]
    CorruptHistory(String),
}

impl MigrationError {
    /// True for failures raised by the decision engine itself, as opposed to
    /// infrastructure failures wrapped with their source.
    pub fn is_migration_failure(&self) -> bool {
        matches!(
            self,
            MigrationError::DependencyViolation { .. } | MigrationError::ChecksumMismatch { .. }
        )
    }
}

/// Result type alias for [`MigrationError`].
pub type MigrationResult<T> = Result<T, MigrationError>;
