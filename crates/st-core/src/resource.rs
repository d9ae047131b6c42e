//! Migration resources: one discovered script each.

use crate::error::{CoreError, CoreResult};
use crate::version::VersionKey;
use serde::Serialize;
use std::fmt;

/// Directive line marking a script that must run outside the main transaction.
pub const NON_TRANSACTIONAL_DIRECTIVE: &str = "-- stratum:non-transactional";

/// Kind of migration, persisted as a one-letter code in the history table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationKind {
    /// Runs at most once
    Versioned,
    /// Re-runs whenever its checksum changes
    Repeatable,
    /// Baseline script applied to an empty database instead of full history
    Init,
}

impl MigrationKind {
    /// One-letter history table code.
    pub fn code(&self) -> &'static str {
        match self {
            MigrationKind::Versioned => "V",
            MigrationKind::Repeatable => "R",
            MigrationKind::Init => "I",
        }
    }

    /// Parse a history table code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "V" => Some(MigrationKind::Versioned),
            "R" => Some(MigrationKind::Repeatable),
            "I" => Some(MigrationKind::Init),
            _ => None,
        }
    }
}

impl fmt::Display for MigrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Immutable descriptor of one migration script.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationResource {
    /// Version key (name for repeatable migrations)
    pub version: VersionKey,

    /// Migration kind
    pub kind: MigrationKind,

    /// Raw script text, before placeholder substitution
    #[serde(skip)]
    pub content: String,

    /// Free-text comment, usually derived from the file name
    pub comment: String,

    /// Where the script came from (file path or logical name)
    pub location: String,

    /// Execute after the main transaction commits, in auto-commit mode
    pub non_transactional: bool,
}

impl MigrationResource {
    /// Create a versioned migration.
    pub fn versioned(version: &str, comment: &str, content: impl Into<String>) -> CoreResult<Self> {
        let version = VersionKey::parse(version)?;
        Ok(Self::build(version, MigrationKind::Versioned, comment, content.into()))
    }

    /// Create a repeatable migration keyed by `name`.
    pub fn repeatable(name: &str, content: impl Into<String>) -> CoreResult<Self> {
        if name.trim().is_empty() {
            return Err(CoreError::InvalidMigrationName {
                name: name.to_string(),
                reason: "repeatable migrations need a name".to_string(),
            });
        }
        let version = VersionKey::repeatable(name.trim());
        Ok(Self::build(
            version,
            MigrationKind::Repeatable,
            name.trim(),
            content.into(),
        ))
    }

    /// Create an init (baseline) migration.
    pub fn init(version: &str, comment: &str, content: impl Into<String>) -> CoreResult<Self> {
        let version = VersionKey::parse(version)?;
        Ok(Self::build(version, MigrationKind::Init, comment, content.into()))
    }

    fn build(version: VersionKey, kind: MigrationKind, comment: &str, content: String) -> Self {
        let location = match kind {
            MigrationKind::Repeatable => format!("R__{}", version),
            MigrationKind::Init => format!("I{}__{}", version, comment),
            MigrationKind::Versioned => format!("V{}__{}", version, comment),
        };
        let non_transactional = has_non_transactional_directive(&content);
        Self {
            version,
            kind,
            content,
            comment: comment.to_string(),
            location,
            non_transactional,
        }
    }

    /// Override the reported location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Mark the script as requiring execution outside the main transaction.
    pub fn with_non_transactional(mut self, non_transactional: bool) -> Self {
        self.non_transactional = non_transactional;
        self
    }

    /// Return true for repeatable migrations.
    pub fn is_repeatable(&self) -> bool {
        self.kind == MigrationKind::Repeatable
    }

    /// History lookup key.
    pub fn key(&self) -> &str {
        self.version.as_str()
    }
}

impl fmt::Display for MigrationResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location)
    }
}

/// Return true when any line of `content` is the non-transactional directive.
pub fn has_non_transactional_directive(content: &str) -> bool {
    content
        .lines()
        .any(|line| line.trim().eq_ignore_ascii_case(NON_TRANSACTIONAL_DIRECTIVE))
}
