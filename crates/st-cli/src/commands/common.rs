//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use serde::Serialize;
use st_core::MigrationConfig;
use st_migrate::MigrationRunner;
use std::path::{Path, PathBuf};

use crate::cli::GlobalArgs;

/// Load the configuration for the selected project.
///
/// Uses `--config` when given, else `stratum.yml`/`stratum.yaml` in the
/// project directory. The database path is resolved with CLI flag >
/// `STRATUM_DATABASE` > config file, and relative paths are taken from the
/// project directory.
pub(crate) fn load_config(global: &GlobalArgs) -> Result<(MigrationConfig, PathBuf)> {
    let root = PathBuf::from(&global.project_dir);
    let mut config = match &global.config {
        Some(path) => MigrationConfig::load(Path::new(path))
            .with_context(|| format!("Failed to load config from {path}"))?,
        None => MigrationConfig::load_from_dir(&root)
            .with_context(|| format!("Failed to load config from {}", root.display()))?,
    };

    let database = config.resolve_database(global.database.as_deref());
    config.database.path = resolve_database_path(&root, &database);

    log::debug!("Project directory: {}", root.display());
    log::debug!("Database: {}", config.database.path);
    log::debug!("History table: {}", config.qualified_table());
    Ok((config, root))
}

/// Build a runner for the project.
pub(crate) fn build_runner(config: MigrationConfig, root: &Path) -> MigrationRunner {
    MigrationRunner::for_project(config, root)
}

fn resolve_database_path(root: &Path, database: &str) -> String {
    if database == ":memory:" || Path::new(database).is_absolute() {
        database.to_string()
    } else {
        root.join(database).display().to_string()
    }
}

/// Print `data` as pretty JSON to stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize results")?;
    println!("{json}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Table-printing utilities
// ---------------------------------------------------------------------------

/// Calculate column widths for a table given headers and row data.
pub(crate) fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }
    widths
}

/// Render a left-aligned table: header, dashed separator, rows.
pub(crate) fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let widths = calculate_column_widths(headers, rows);
    let line = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = Vec::with_capacity(rows.len() + 2);
    out.push(line(headers.iter().map(|h| h.to_string()).collect()));
    out.push(line(widths.iter().map(|&w| "-".repeat(w)).collect()));
    for row in rows {
        out.push(line(row.clone()));
    }
    out.join("\n")
}

/// Print a formatted table to stdout.
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    println!("{}", format_table(headers, rows));
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
