//! The migration history table and the per-resource decision engine.
//!
//! [`MigrationTable`] holds the rows loaded from the history table (under
//! lock, inside the invocation's transaction) and decides for each discovered
//! resource whether to skip, patch, execute or fail.

use crate::error::{MigrationError, MigrationResult};
use crate::history::{load_rows, HistoryRow};
use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use st_core::{
    compute_checksum, MigrationConfig, MigrationKind, MigrationResource, ScriptTransform,
    VersionKey,
};
use st_db::{platform, CommandHandlers, MigrationConnection, ScriptExecutor};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// What happened to one resource during an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Executed and recorded for the first time
    Applied,
    /// Re-executed, history row updated in place
    Reapplied,
    /// Recorded without executing
    PatchInserted,
    /// Checksum updated without executing
    PatchReset,
    /// Already applied with a matching checksum
    Skipped,
    /// Covered by the init (baseline) script
    Baseline,
    /// Non-transactional, executed after commit
    Deferred,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Outcome::Applied => "applied",
            Outcome::Reapplied => "reapplied",
            Outcome::PatchInserted => "patch_inserted",
            Outcome::PatchReset => "patch_reset",
            Outcome::Skipped => "skipped",
            Outcome::Baseline => "baseline",
            Outcome::Deferred => "deferred",
        };
        f.write_str(s)
    }
}

/// Outcome log entry for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationOutcome {
    pub version: String,
    pub kind: MigrationKind,
    pub location: String,
    pub outcome: Outcome,
    pub run_millis: i64,
}

/// Settings the table needs from the configuration, resolved for one
/// invocation.
#[derive(Debug, Clone)]
pub struct TableOptions {
    pub platform: String,
    pub schema: Option<String>,
    pub table: String,
    /// Custom create-table DDL, overriding the platform template
    pub custom_ddl: Option<String>,
    pub run_by: String,
    pub transform: ScriptTransform,
    pub patch_insert_on: HashSet<String>,
    pub patch_reset_checksum_on: HashSet<String>,
    pub skip_checksum: bool,
    /// Dry-run: classify without touching the database
    pub check_state: bool,
}

impl TableOptions {
    /// Resolve options from a configuration.
    pub fn from_config(
        config: &MigrationConfig,
        platform: impl Into<String>,
        custom_ddl: Option<String>,
        check_state: bool,
    ) -> MigrationResult<Self> {
        Ok(Self {
            platform: platform.into(),
            schema: config.schema.clone(),
            table: config.table.clone(),
            custom_ddl,
            run_by: config.resolve_run_by(),
            transform: config.script_transform()?,
            patch_insert_on: config.patch_insert_on.clone(),
            patch_reset_checksum_on: config.patch_reset_checksum_on.clone(),
            skip_checksum: config.skip_checksum,
            check_state,
        })
    }

    fn sql_table(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.table),
            None => self.table.clone(),
        }
    }
}

/// A non-transactional resource waiting for the commit.
#[derive(Debug)]
struct Deferred {
    resource: MigrationResource,
    script: String,
    checksum: i32,
    row: usize,
    rerun: bool,
}

/// In-memory projection of the history table plus the decision engine.
pub struct MigrationTable<'a> {
    conn: &'a dyn MigrationConnection,
    executor: &'a dyn ScriptExecutor,
    handlers: &'a CommandHandlers,
    options: TableOptions,
    sql_table: String,
    run_on: DateTime<Utc>,
    rows: Vec<HistoryRow>,
    index: HashMap<String, usize>,
    last_id: i32,
    baseline: Option<VersionKey>,
    deferred: Vec<Deferred>,
    check_migrations: Vec<MigrationResource>,
    outcomes: Vec<MigrationOutcome>,
}

impl<'a> MigrationTable<'a> {
    /// Create an empty table bound to an open connection.
    pub fn new(
        conn: &'a dyn MigrationConnection,
        executor: &'a dyn ScriptExecutor,
        handlers: &'a CommandHandlers,
        options: TableOptions,
    ) -> Self {
        let sql_table = options.sql_table();
        Self {
            conn,
            executor,
            handlers,
            options,
            sql_table,
            // The history column keeps microseconds
            run_on: Utc::now().trunc_subsecs(6),
            rows: Vec::new(),
            index: HashMap::new(),
            last_id: 0,
            baseline: None,
            deferred: Vec::new(),
            check_migrations: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    /// True when no history rows are loaded.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of history rows.
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    /// History rows in insertion order, including rows synthesised this run.
    pub fn rows(&self) -> &[HistoryRow] {
        &self.rows
    }

    /// Version recorded by the init script, if any.
    pub fn baseline(&self) -> Option<&VersionKey> {
        self.baseline.as_ref()
    }

    /// Resources executed (or, in dry-run mode, that would be executed).
    pub fn ran(&self) -> &[MigrationResource] {
        &self.check_migrations
    }

    /// Per-resource outcomes in classification order.
    pub fn outcomes(&self) -> &[MigrationOutcome] {
        &self.outcomes
    }

    /// Consume the table, returning what ran and the outcome log.
    pub fn finish(self) -> (Vec<MigrationResource>, Vec<MigrationOutcome>) {
        (self.check_migrations, self.outcomes)
    }

    /// Create the history table if needed, then load its rows.
    ///
    /// The select runs inside the caller's open transaction and holds row
    /// locks where the platform supports them, serialising concurrent runs.
    pub fn create_if_needed_and_lock(&mut self) -> MigrationResult<()> {
        if !self.table_exists()? {
            self.create_table()?;
        }

        let rows = load_rows(self.conn, &self.options.platform, &self.sql_table)?;
        for row in rows {
            if row.kind == MigrationKind::Init {
                let version = row.version_key()?;
                if self.baseline.as_ref().map_or(true, |b| version > *b) {
                    self.baseline = Some(version);
                }
            }
            self.add_row(row)?;
        }
        log::debug!(
            "Loaded {} migration history row(s) from {}",
            self.rows.len(),
            self.sql_table
        );
        Ok(())
    }

    fn table_exists(&self) -> MigrationResult<bool> {
        let table = platform::fold_identifier(self.conn, &self.options.table);
        let schema = self
            .options
            .schema
            .as_deref()
            .map(|s| platform::fold_identifier(self.conn, s));
        Ok(self.conn.table_exists(schema.as_deref(), &table)?)
    }

    fn create_table(&self) -> MigrationResult<()> {
        log::info!("Creating migration table {}", self.sql_table);
        let ddl = self.create_table_ddl();
        self.executor
            .run_script(self.conn, false, &ddl, "create migration table", self.handlers)?;
        Ok(())
    }

    /// The create-table script: custom DDL, else the platform template, else
    /// the default, with `${table}` and `${pk_table}` substituted.
    pub fn create_table_ddl(&self) -> String {
        let template = self
            .options
            .custom_ddl
            .as_deref()
            .or_else(|| platform::ddl_template_for(&self.options.platform))
            .unwrap_or(platform::DEFAULT_CREATE_TABLE);
        let script = ScriptTransform::replace("${table}", &self.sql_table, template);
        let pk = format!("pk_{}", self.options.table);
        ScriptTransform::replace("${pk_table}", &pk, &script)
    }

    /// Classify every resource in order.
    pub fn run_all(&mut self, resources: &[MigrationResource]) -> MigrationResult<()> {
        let mut prior: Option<&MigrationResource> = None;
        for resource in resources {
            self.classify(resource, prior)?;
            if !resource.is_repeatable() {
                prior = Some(resource);
            }
        }
        Ok(())
    }

    /// Apply the init script to an empty table, then classify the rest.
    ///
    /// Versioned resources at or below the init version are satisfied by it.
    pub fn run_init(
        &mut self,
        init: &MigrationResource,
        resources: &[MigrationResource],
    ) -> MigrationResult<()> {
        log::info!("Applying init migration {}", init.location);
        let script = self.options.transform.transform(&init.content);
        let checksum = compute_checksum(&script);
        let mut row = self.next_row(init, MigrationKind::Init, checksum, 0);

        if !self.options.check_state {
            row.run_millis = self.execute_script(init, &script)?;
            row.insert(self.conn, &self.sql_table)?;
        }
        let run_millis = row.run_millis;
        self.add_row(row)?;
        self.check_migrations.push(init.clone());
        self.baseline = Some(init.version.clone());
        self.record(init, Outcome::Applied, run_millis);

        self.run_all(resources)
    }

    /// Decide and act on one resource given its preceding versioned resource.
    pub fn classify(
        &mut self,
        resource: &MigrationResource,
        prior: Option<&MigrationResource>,
    ) -> MigrationResult<Outcome> {
        if !resource.is_repeatable() && self.covered_by_baseline(resource) {
            log::trace!("... skip {} covered by init migration", resource.location);
            self.record(resource, Outcome::Baseline, 0);
            return Ok(Outcome::Baseline);
        }

        if let Some(prior) = prior {
            if !resource.is_repeatable()
                && !self.index.contains_key(prior.key())
                && !self.covered_by_baseline(prior)
            {
                log::error!(
                    "Migration {} requires prior migration {} which has not been run",
                    resource.version,
                    prior.version
                );
                return Err(MigrationError::DependencyViolation {
                    version: resource.key().to_string(),
                    prior: prior.key().to_string(),
                });
            }
        }

        let script = self.options.transform.transform(&resource.content);
        let checksum = compute_checksum(&script);

        let outcome = match self.index.get(resource.key()).copied() {
            None if self.options.patch_insert_on.contains(resource.key()) => {
                log::info!("Patch migration - insert into history {}", resource.location);
                let row = self.next_row(resource, resource.kind, checksum, 0);
                if !self.options.check_state {
                    row.insert(self.conn, &self.sql_table)?;
                }
                self.add_row(row)?;
                Outcome::PatchInserted
            }
            None => self.execute(resource, &script, checksum, None)?,
            Some(idx) => self.existing(resource, &script, checksum, idx)?,
        };
        Ok(outcome)
    }

    fn existing(
        &mut self,
        resource: &MigrationResource,
        script: &str,
        checksum: i32,
        idx: usize,
    ) -> MigrationResult<Outcome> {
        if self.rows[idx].checksum == checksum {
            log::trace!("... skip unchanged migration {}", resource.location);
            self.record(resource, Outcome::Skipped, 0);
            return Ok(Outcome::Skipped);
        }

        if self
            .options
            .patch_reset_checksum_on
            .contains(&self.rows[idx].version)
        {
            log::info!("Patch migration - reset checksum on {}", resource.location);
            self.rows[idx].checksum = checksum;
            if !self.options.check_state {
                self.rows[idx].update_checksum(self.conn, &self.sql_table)?;
            }
            self.record(resource, Outcome::PatchReset, 0);
            return Ok(Outcome::PatchReset);
        }

        if resource.is_repeatable() || self.options.skip_checksum {
            return self.execute(resource, script, checksum, Some(idx));
        }

        Err(MigrationError::ChecksumMismatch {
            version: resource.key().to_string(),
            location: resource.location.clone(),
        })
    }

    /// Run a new or re-run resource, or defer it when non-transactional.
    fn execute(
        &mut self,
        resource: &MigrationResource,
        script: &str,
        checksum: i32,
        existing: Option<usize>,
    ) -> MigrationResult<Outcome> {
        let rerun_outcome = if existing.is_some() {
            Outcome::Reapplied
        } else {
            Outcome::Applied
        };

        if self.options.check_state {
            self.check_migrations.push(resource.clone());
            match existing {
                Some(idx) => self.rows[idx].checksum = checksum,
                None => {
                    let row = self.next_row(resource, resource.kind, checksum, 1);
                    self.add_row(row)?;
                }
            }
            self.record(resource, rerun_outcome, 0);
            return Ok(rerun_outcome);
        }

        if resource.non_transactional {
            log::debug!("Deferring non-transactional migration {}", resource.location);
            let row = match existing {
                Some(idx) => idx,
                None => {
                    let row = self.next_row(resource, resource.kind, checksum, 0);
                    self.add_row(row)?
                }
            };
            self.deferred.push(Deferred {
                resource: resource.clone(),
                script: script.to_string(),
                checksum,
                row,
                rerun: existing.is_some(),
            });
            self.record(resource, Outcome::Deferred, 0);
            return Ok(Outcome::Deferred);
        }

        log::debug!("Run migration {}", resource.location);
        let run_millis = self.execute_script(resource, script)?;

        match existing {
            Some(idx) => {
                let run_by = self.options.run_by.clone();
                self.rows[idx].rerun(checksum, run_millis, &run_by, self.run_on);
                self.rows[idx].update(self.conn, &self.sql_table)?;
            }
            None => {
                let row = self.next_row(resource, resource.kind, checksum, run_millis);
                row.insert(self.conn, &self.sql_table)?;
                self.add_row(row)?;
            }
        }
        self.check_migrations.push(resource.clone());
        self.record(resource, rerun_outcome, run_millis);
        Ok(rerun_outcome)
    }

    fn execute_script(&self, resource: &MigrationResource, script: &str) -> MigrationResult<i64> {
        let start = Instant::now();
        let description = format!("run migration version: {}", resource.version);
        self.executor
            .run_script(self.conn, false, script, &description, self.handlers)
            .map_err(|source| MigrationError::ScriptFailed {
                version: resource.key().to_string(),
                source,
            })?;
        Ok(elapsed_millis(start))
    }

    /// Execute the deferred non-transactional scripts in auto-commit mode and
    /// record them. Must be called after the main transaction committed.
    pub fn run_non_transactional(&mut self) -> MigrationResult<usize> {
        let deferred = std::mem::take(&mut self.deferred);
        let count = deferred.len();

        for item in deferred {
            let key = item.resource.key().to_string();
            let fail = |source| MigrationError::NonTransactionalFailed {
                version: key.clone(),
                source,
            };

            log::debug!("Run non-transactional migration {}", item.resource.location);
            let start = Instant::now();
            let description = format!("run migration version: {}", item.resource.version);
            self.executor
                .run_script(self.conn, true, &item.script, &description, self.handlers)
                .map_err(fail)?;
            let run_millis = elapsed_millis(start);

            let run_by = self.options.run_by.clone();
            let row = &mut self.rows[item.row];
            row.rerun(item.checksum, run_millis, &run_by, self.run_on);
            if item.rerun {
                row.update(self.conn, &self.sql_table).map_err(fail)?;
            } else {
                row.insert(self.conn, &self.sql_table).map_err(fail)?;
            }

            if let Some(entry) = self
                .outcomes
                .iter_mut()
                .rev()
                .find(|o| o.version == key && o.outcome == Outcome::Deferred)
            {
                entry.run_millis = run_millis;
            }
            self.check_migrations.push(item.resource);
        }
        Ok(count)
    }

    fn covered_by_baseline(&self, resource: &MigrationResource) -> bool {
        match &self.baseline {
            Some(baseline) => {
                !resource.is_repeatable() && resource.version.cmp_numeric(baseline) != Ordering::Greater
            }
            None => false,
        }
    }

    fn next_row(
        &self,
        resource: &MigrationResource,
        kind: MigrationKind,
        checksum: i32,
        run_millis: i64,
    ) -> HistoryRow {
        HistoryRow {
            id: self.last_id + 1,
            kind,
            version: resource.key().to_string(),
            comment: resource.comment.clone(),
            checksum,
            ran_by: self.options.run_by.clone(),
            ran_on: self.run_on,
            run_millis,
        }
    }

    fn add_row(&mut self, row: HistoryRow) -> MigrationResult<usize> {
        if row.version.is_empty() {
            return Err(MigrationError::CorruptHistory(format!(
                "row {} has no version",
                row.id
            )));
        }
        self.last_id = self.last_id.max(row.id);
        let idx = self.rows.len();
        self.index.insert(row.version.clone(), idx);
        self.rows.push(row);
        Ok(idx)
    }

    fn record(&mut self, resource: &MigrationResource, outcome: Outcome, run_millis: i64) {
        self.outcomes.push(MigrationOutcome {
            version: resource.key().to_string(),
            kind: resource.kind,
            location: resource.location.clone(),
            outcome,
            run_millis,
        });
    }
}

fn elapsed_millis(start: Instant) -> i64 {
    i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
#[path = "table_test.rs"]
mod tests;
