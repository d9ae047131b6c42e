//! Configuration types and parsing for stratum.yml

use crate::error::{CoreError, CoreResult};
use crate::serde_helpers::{normalise_keys, version_set};
use crate::transform::ScriptTransform;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Environment variable overriding the configured database path.
pub const DATABASE_ENV_VAR: &str = "STRATUM_DATABASE";

const DEFAULT_TABLE: &str = "db_migration";

const DEFAULT_MIGRATION_PATH: &str = "migrations";

const DEFAULT_DB_PATH: &str = ":memory:";

/// Migration configuration from stratum.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    /// Directory holding versioned and repeatable migration scripts
    #[serde(default = "default_migration_path")]
    pub migration_path: String,

    /// Directory holding init (baseline) scripts, used on an empty database
    #[serde(default)]
    pub init_path: Option<String>,

    /// Name of the history table
    #[serde(default = "default_table")]
    pub table: String,

    /// Schema holding the history table (and selected for the run)
    #[serde(default)]
    pub schema: Option<String>,

    /// Create `schema` when it does not exist
    #[serde(default)]
    pub create_schema: bool,

    /// Platform name override; derived from the connection when unset
    #[serde(default)]
    pub platform: Option<String>,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Placeholder values substituted into scripts as `${key}`
    #[serde(default)]
    pub placeholders: HashMap<String, String>,

    /// Placeholders as a `key=value;key2=value2` string
    #[serde(default)]
    pub run_placeholders: Option<String>,

    /// Versions recorded as applied without running them
    #[serde(default, deserialize_with = "version_set")]
    pub patch_insert_on: HashSet<String>,

    /// Versions whose stored checksum is replaced without re-running them
    #[serde(default, deserialize_with = "version_set")]
    pub patch_reset_checksum_on: HashSet<String>,

    /// Re-run changed versioned migrations instead of failing on checksum mismatch
    #[serde(default)]
    pub skip_checksum: bool,

    /// Path to a custom history table DDL template
    #[serde(default)]
    pub create_table_ddl: Option<String>,

    /// Value stored in the `run_by` column; defaults to the OS user
    #[serde(default)]
    pub run_by: Option<String>,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database path (file path or :memory:)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migration_path: default_migration_path(),
            init_path: None,
            table: default_table(),
            schema: None,
            create_schema: false,
            platform: None,
            database: DatabaseConfig::default(),
            placeholders: HashMap::new(),
            run_placeholders: None,
            patch_insert_on: HashSet::new(),
            patch_reset_checksum_on: HashSet::new(),
            skip_checksum: false,
            create_table_ddl: None,
            run_by: None,
        }
    }
}

fn default_migration_path() -> String {
    DEFAULT_MIGRATION_PATH.to_string()
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

impl MigrationConfig {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: MigrationConfig =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                message: format!("{}: {}", path.display(), e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for stratum.yml or stratum.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("stratum.yml");
        let yaml_path = dir.join("stratum.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if !is_identifier(&self.table) {
            return Err(CoreError::ConfigInvalid {
                message: format!("History table name '{}' is not a valid identifier", self.table),
            });
        }
        if let Some(schema) = &self.schema {
            if !is_identifier(schema) {
                return Err(CoreError::ConfigInvalid {
                    message: format!("Schema name '{}' is not a valid identifier", schema),
                });
            }
        }
        if self.create_schema && self.schema.is_none() {
            return Err(CoreError::ConfigInvalid {
                message: "create_schema requires schema to be set".to_string(),
            });
        }
        if self.migration_path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "migration_path cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Replace the patch-insert versions from a comma-separated list
    pub fn set_patch_insert_on(&mut self, versions: &str) {
        self.patch_insert_on = normalise_keys(versions.split(','));
    }

    /// Replace the patch-reset-checksum versions from a comma-separated list
    pub fn set_patch_reset_checksum_on(&mut self, versions: &str) {
        self.patch_reset_checksum_on = normalise_keys(versions.split(','));
    }

    /// Build the placeholder transform for migration scripts
    pub fn script_transform(&self) -> CoreResult<ScriptTransform> {
        ScriptTransform::build(self.run_placeholders.as_deref(), &self.placeholders)
    }

    /// Schema-qualified history table name
    pub fn qualified_table(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.table),
            None => self.table.clone(),
        }
    }

    /// Get absolute migration path relative to a project root
    pub fn migration_path_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.migration_path)
    }

    /// Get absolute init path relative to a project root
    pub fn init_path_absolute(&self, root: &Path) -> Option<PathBuf> {
        self.init_path.as_ref().map(|p| root.join(p))
    }

    /// Get absolute custom DDL template path relative to a project root
    pub fn create_table_ddl_absolute(&self, root: &Path) -> Option<PathBuf> {
        self.create_table_ddl.as_ref().map(|p| root.join(p))
    }

    /// Resolve the database path.
    ///
    /// Precedence: CLI flag > `STRATUM_DATABASE` env var > config file.
    pub fn resolve_database(&self, cli_database: Option<&str>) -> String {
        cli_database
            .map(String::from)
            .or_else(|| std::env::var(DATABASE_ENV_VAR).ok())
            .unwrap_or_else(|| self.database.path.clone())
    }

    /// Resolve the value for the `run_by` history column.
    pub fn resolve_run_by(&self) -> String {
        self.run_by
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .or_else(|| std::env::var("USERNAME").ok())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Return true for plain SQL identifiers (`[A-Za-z_][A-Za-z0-9_]*`).
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
