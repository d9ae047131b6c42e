//! Orchestration of one migration invocation.
//!
//! [`MigrationRunner`] acquires a connection, opens the transaction, ensures
//! the schema and history table, hands the discovered resources to a
//! [`MigrationTable`], commits, runs deferred non-transactional scripts and
//! always closes the connection.

use crate::error::MigrationResult;
use crate::history::{load_rows, HistoryRow};
use crate::schema;
use crate::table::{MigrationOutcome, MigrationTable, Outcome, TableOptions};
use serde::Serialize;
use st_core::{CoreError, DirectorySource, MigrationConfig, MigrationResource, ResourceSource};
use st_db::{
    platform, CommandHandlers, ConnectionProvider, CustomCommandHandler, DuckDbDriver,
    MigrationConnection, ScriptExecutor, StatementExecutor,
};
use std::path::{Path, PathBuf};

/// Result of a migration run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    /// Per-resource outcomes in classification order
    pub outcomes: Vec<MigrationOutcome>,
}

impl MigrationReport {
    /// Number of resources with the given outcome.
    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.iter().filter(|o| o.outcome == outcome).count()
    }

    /// Outcomes for resources whose script was executed.
    pub fn executed(&self) -> impl Iterator<Item = &MigrationOutcome> {
        self.outcomes.iter().filter(|o| {
            matches!(
                o.outcome,
                Outcome::Applied | Outcome::Reapplied | Outcome::Deferred
            )
        })
    }

    /// True when nothing was executed or patched.
    pub fn is_noop(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| matches!(o.outcome, Outcome::Skipped | Outcome::Baseline))
    }
}

/// Runs migrations against a database.
pub struct MigrationRunner {
    config: MigrationConfig,
    source: Box<dyn ResourceSource>,
    executor: Box<dyn ScriptExecutor>,
    handlers: CommandHandlers,
    create_table_ddl: Option<PathBuf>,
}

impl MigrationRunner {
    /// Create a runner discovering scripts from the configured paths,
    /// relative to the working directory.
    pub fn new(config: MigrationConfig) -> Self {
        Self::for_project(config, Path::new("."))
    }

    /// Create a runner whose configured paths are relative to `root`.
    pub fn for_project(config: MigrationConfig, root: &Path) -> Self {
        let source = DirectorySource::new(
            config.migration_path_absolute(root),
            config.init_path_absolute(root),
        );
        let create_table_ddl = config.create_table_ddl_absolute(root);
        Self {
            config,
            source: Box::new(source),
            executor: Box::new(StatementExecutor),
            handlers: CommandHandlers::new(),
            create_table_ddl,
        }
    }

    /// Replace resource discovery.
    pub fn with_resources(mut self, source: impl ResourceSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    /// Replace the script executor.
    pub fn with_executor(mut self, executor: impl ScriptExecutor + 'static) -> Self {
        self.executor = Box::new(executor);
        self
    }

    /// Register a handler for `#name` commands in scripts.
    pub fn with_command_handler(
        mut self,
        name: impl Into<String>,
        handler: impl CustomCommandHandler + 'static,
    ) -> Self {
        self.handlers.insert(name.into(), Box::new(handler));
        self
    }

    /// The configuration this runner was built with.
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Run migrations on a connection opened from `config.database`.
    pub fn run(&self) -> MigrationResult<MigrationReport> {
        self.run_with(&self.driver())
    }

    /// Run migrations on a connection from `provider`.
    pub fn run_with(&self, provider: &dyn ConnectionProvider) -> MigrationResult<MigrationReport> {
        self.run_on(provider.connect()?)
    }

    /// Run migrations on `conn`, closing it afterwards.
    pub fn run_on(&self, conn: Box<dyn MigrationConnection>) -> MigrationResult<MigrationReport> {
        let (_, outcomes) = self.invoke(conn, false)?;
        Ok(MigrationReport { outcomes })
    }

    /// Return the resources the next run would execute, without changing
    /// the database.
    pub fn check_state(&self) -> MigrationResult<Vec<MigrationResource>> {
        self.check_state_with(&self.driver())
    }

    /// Dry-run on a connection from `provider`.
    pub fn check_state_with(
        &self,
        provider: &dyn ConnectionProvider,
    ) -> MigrationResult<Vec<MigrationResource>> {
        self.check_state_on(provider.connect()?)
    }

    /// Dry-run on `conn`, closing it afterwards.
    pub fn check_state_on(
        &self,
        conn: Box<dyn MigrationConnection>,
    ) -> MigrationResult<Vec<MigrationResource>> {
        let (ran, _) = self.invoke(conn, true)?;
        Ok(ran)
    }

    /// Read the history table from a connection opened from `config.database`.
    pub fn history(&self) -> MigrationResult<Vec<HistoryRow>> {
        self.history_on(self.driver().connect()?)
    }

    /// Read the history table on `conn`, closing it afterwards. A missing
    /// table reads as empty.
    pub fn history_on(&self, conn: Box<dyn MigrationConnection>) -> MigrationResult<Vec<HistoryRow>> {
        let result = self.read_history(conn.as_ref());
        close(conn);
        result
    }

    fn read_history(&self, conn: &dyn MigrationConnection) -> MigrationResult<Vec<HistoryRow>> {
        let table = platform::fold_identifier(conn, &self.config.table);
        let schema = self
            .config
            .schema
            .as_deref()
            .map(|s| platform::fold_identifier(conn, s));
        if !conn.table_exists(schema.as_deref(), &table)? {
            return Ok(Vec::new());
        }
        // Plain select; no lock is needed outside a migration run
        load_rows(conn, "", &self.config.qualified_table())
    }

    fn driver(&self) -> DuckDbDriver {
        DuckDbDriver::new(self.config.database.path.clone())
    }

    fn invoke(
        &self,
        conn: Box<dyn MigrationConnection>,
        check_state: bool,
    ) -> MigrationResult<(Vec<MigrationResource>, Vec<MigrationOutcome>)> {
        let result = self.invoke_on(conn.as_ref(), check_state);
        if let Err(err) = &result {
            if !err.is_migration_failure() {
                log::error!("Migration run failed: {err}");
            }
            rollback(conn.as_ref());
        }
        close(conn);
        result
    }

    fn invoke_on(
        &self,
        conn: &dyn MigrationConnection,
        check_state: bool,
    ) -> MigrationResult<(Vec<MigrationResource>, Vec<MigrationOutcome>)> {
        let versions = self.source.versions()?;
        if versions.is_empty() {
            log::debug!("No migrations to check");
            return Ok((Vec::new(), Vec::new()));
        }

        conn.begin()?;
        let platform_name = match &self.config.platform {
            Some(name) => platform::normalise_name(name),
            None => platform::normalise(conn),
        };

        schema::create_and_set_if_needed(conn, &self.config)?;

        let options = TableOptions::from_config(
            &self.config,
            platform_name.as_str(),
            self.custom_ddl()?,
            check_state,
        )?;
        let mut table = MigrationTable::new(conn, self.executor.as_ref(), &self.handlers, options);
        table.create_if_needed_and_lock()?;

        let init = if table.is_empty() {
            self.source.init_versions()?.pop()
        } else {
            None
        };

        match init {
            Some(init) => {
                log::info!(
                    "Init migration version: {}  local migrations: {}  check state: {}",
                    init.version,
                    versions.len(),
                    check_state
                );
                table.run_init(&init, &versions)?;
            }
            None => {
                log::info!(
                    "Local migrations: {}  existing migrations: {}  check state: {}",
                    versions.len(),
                    table.size(),
                    check_state
                );
                table.run_all(&versions)?;
            }
        }

        if check_state {
            conn.rollback()?;
        } else {
            conn.commit()?;
            let deferred = table.run_non_transactional()?;
            if deferred > 0 {
                log::info!("Ran {deferred} non-transactional migration(s) after commit");
            }
        }
        Ok(table.finish())
    }

    fn custom_ddl(&self) -> MigrationResult<Option<String>> {
        let Some(path) = &self.create_table_ddl else {
            return Ok(None);
        };
        let ddl = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(Some(ddl))
    }
}

fn rollback(conn: &dyn MigrationConnection) {
    if let Err(e) = conn.rollback() {
        log::warn!("Error on rollback: {e}");
    }
}

fn close(conn: Box<dyn MigrationConnection>) {
    if let Err(e) = conn.close() {
        log::warn!("Error closing connection: {e}");
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
