//! Migration resource discovery.
//!
//! File naming:
//! - `V1.1__add_orders.sql` or `1.1__add_orders.sql`: versioned
//! - `R__order_view.sql`: repeatable, keyed by `order_view`
//! - any versioned name inside the init directory (optionally `I1.1__...`): init

use crate::error::{CoreError, CoreResult};
use crate::resource::MigrationResource;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Supplies migration resources to the runner, sorted by version key.
pub trait ResourceSource {
    /// Versioned and repeatable migrations.
    fn versions(&self) -> CoreResult<Vec<MigrationResource>>;

    /// Init (baseline) migrations; empty when none are configured.
    fn init_versions(&self) -> CoreResult<Vec<MigrationResource>>;
}

/// Discovers `.sql` scripts from directories on disk.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    migration_dir: PathBuf,
    init_dir: Option<PathBuf>,
}

impl DirectorySource {
    /// Create a source over a migration directory and optional init directory.
    pub fn new(migration_dir: impl Into<PathBuf>, init_dir: Option<PathBuf>) -> Self {
        Self {
            migration_dir: migration_dir.into(),
            init_dir,
        }
    }

    fn load_dir(dir: &Path, init: bool) -> CoreResult<Vec<MigrationResource>> {
        if !dir.exists() {
            log::debug!("Migration directory {} does not exist", dir.display());
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        collect_sql_files(dir, &mut files)?;

        let mut resources = Vec::with_capacity(files.len());
        for path in files {
            let content = std::fs::read_to_string(&path).map_err(|e| CoreError::IoWithPath {
                path: path.display().to_string(),
                source: e,
            })?;
            resources.push(parse_resource(&path, content, init)?);
        }
        sort_and_check(resources)
    }
}

impl ResourceSource for DirectorySource {
    fn versions(&self) -> CoreResult<Vec<MigrationResource>> {
        Self::load_dir(&self.migration_dir, false)
    }

    fn init_versions(&self) -> CoreResult<Vec<MigrationResource>> {
        match &self.init_dir {
            Some(dir) => Self::load_dir(dir, true),
            None => Ok(Vec::new()),
        }
    }
}

/// Serves resources built in code, e.g. scripts embedded with `include_str!`.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    versions: Vec<MigrationResource>,
    init_versions: Vec<MigrationResource>,
}

impl StaticSource {
    /// Create a source from versioned/repeatable resources.
    pub fn new(versions: Vec<MigrationResource>) -> Self {
        Self {
            versions,
            init_versions: Vec::new(),
        }
    }

    /// Add init (baseline) resources.
    pub fn with_init(mut self, init_versions: Vec<MigrationResource>) -> Self {
        self.init_versions = init_versions;
        self
    }
}

impl ResourceSource for StaticSource {
    fn versions(&self) -> CoreResult<Vec<MigrationResource>> {
        sort_and_check(self.versions.clone())
    }

    fn init_versions(&self) -> CoreResult<Vec<MigrationResource>> {
        sort_and_check(self.init_versions.clone())
    }
}

fn collect_sql_files(dir: &Path, files: &mut Vec<PathBuf>) -> CoreResult<()> {
    for entry in std::fs::read_dir(dir).map_err(|e| CoreError::IoWithPath {
        path: dir.display().to_string(),
        source: e,
    })? {
        let entry = entry.map_err(|e| CoreError::IoWithPath {
            path: dir.display().to_string(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_sql_files(&path, files)?;
        } else if path.extension().is_some_and(|e| e == "sql") {
            files.push(path);
        }
    }
    Ok(())
}

/// Build a resource from a script file name and content.
pub fn parse_resource(path: &Path, content: String, init: bool) -> CoreResult<MigrationResource> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| CoreError::InvalidMigrationName {
            name: path.display().to_string(),
            reason: "file name is not valid UTF-8".to_string(),
        })?;

    let resource = if let Some(name) = stem.strip_prefix("R__") {
        if init {
            return Err(CoreError::InvalidMigrationName {
                name: stem.to_string(),
                reason: "repeatable migrations are not allowed in the init directory".to_string(),
            });
        }
        MigrationResource::repeatable(name, content)?
    } else {
        let (version, comment) = split_versioned_name(stem, init)?;
        if init {
            MigrationResource::init(version, &comment, content)?
        } else {
            MigrationResource::versioned(version, &comment, content)?
        }
    };
    Ok(resource.with_location(path.display().to_string()))
}

/// Split `V1.1__add_orders` into (`1.1`, `add orders`).
fn split_versioned_name(stem: &str, init: bool) -> CoreResult<(&str, String)> {
    let unprefixed = stem
        .strip_prefix('V')
        .or_else(|| stem.strip_prefix('v'))
        .or_else(|| if init { stem.strip_prefix('I') } else { None })
        .unwrap_or(stem);
    let (version, comment) = match unprefixed.split_once("__") {
        Some((version, comment)) => (version, comment.replace('_', " ")),
        None => (unprefixed, String::new()),
    };
    if version.is_empty() {
        return Err(CoreError::InvalidMigrationName {
            name: stem.to_string(),
            reason: "missing version before '__'".to_string(),
        });
    }
    Ok((version, comment))
}

fn sort_and_check(mut resources: Vec<MigrationResource>) -> CoreResult<Vec<MigrationResource>> {
    resources.sort_by(|a, b| a.version.cmp(&b.version));
    {
        let mut seen: HashMap<&str, &str> = HashMap::new();
        for resource in &resources {
            if let Some(first) = seen.insert(resource.key(), &resource.location) {
                return Err(CoreError::DuplicateVersion {
                    version: resource.key().to_string(),
                    path1: first.to_string(),
                    path2: resource.location.clone(),
                });
            }
        }
    }
    Ok(resources)
}

#[cfg(test)]
#[path = "discovery_test.rs"]
mod tests;
