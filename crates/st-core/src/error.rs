//! Error types for st-core

use thiserror::Error;

/// Core error type for Stratum
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// E003: Invalid configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E004: Migration file name does not follow the naming convention
    #[error("[E004] Invalid migration file name '{name}': {reason}")]
    InvalidMigrationName { name: String, reason: String },

    /// E005: Version string cannot be parsed
    #[error("[E005] Invalid migration version '{version}'")]
    InvalidVersion { version: String },

    /// E006: Two resources share the same version key
    #[error("[E006] Duplicate migration version '{version}' in {path1} and {path2}")]
    DuplicateVersion {
        version: String,
        path1: String,
        path2: String,
    },

    /// E007: Malformed placeholder definition
    #[error("[E007] Invalid placeholder '{entry}': expected key=value")]
    InvalidPlaceholder { entry: String },

    /// E014: IO error
    #[error("[E014] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E016: IO error with file path context
    #[error("[E016] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E015: YAML parse error
    #[error("[E015] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
