//! Rows of the migration history table.

use crate::error::{MigrationError, MigrationResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use st_core::{MigrationKind, VersionKey};
use st_db::{platform, DbResult, MigrationConnection, SqlValue};

/// Column list shared by every history statement, in row order.
pub const HISTORY_COLUMNS: &str =
    "id, version, kind, comment, checksum, ran_by, ran_on, run_millis";

const COLUMN_COUNT: usize = 8;

/// Persisted record of one applied migration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRow {
    pub id: i32,
    pub version: String,
    pub kind: MigrationKind,
    pub comment: String,
    pub checksum: i32,
    pub ran_by: String,
    pub ran_on: DateTime<Utc>,
    pub run_millis: i64,
}

impl HistoryRow {
    /// Build a row from the values selected with [`HISTORY_COLUMNS`].
    pub fn from_values(values: &[SqlValue]) -> MigrationResult<Self> {
        if values.len() < COLUMN_COUNT {
            return Err(MigrationError::CorruptHistory(format!(
                "expected {COLUMN_COUNT} columns, got {}",
                values.len()
            )));
        }
        let corrupt = |e: st_db::DbError| MigrationError::CorruptHistory(e.to_string());

        let id = values[0].as_i64("id").map_err(corrupt)?;
        let id = i32::try_from(id)
            .map_err(|_| MigrationError::CorruptHistory(format!("id {id} out of range")))?;

        let version = values[1].as_text();
        if version.is_empty() {
            return Err(MigrationError::CorruptHistory(format!(
                "row {id}: no version"
            )));
        }

        let code = values[2].as_text();
        let kind = MigrationKind::from_code(code.trim()).ok_or_else(|| {
            MigrationError::CorruptHistory(format!("row {id}: unknown migration type '{code}'"))
        })?;

        let checksum = values[4].as_i64("checksum").map_err(corrupt)?;
        // Checksums are stored as 32-bit integers; wider backends may hand
        // them back sign-extended.
        let checksum = checksum as i32;

        Ok(Self {
            id,
            kind,
            version,
            comment: values[3].as_text(),
            checksum,
            ran_by: values[5].as_text(),
            ran_on: values[6].as_timestamp("ran_on").map_err(corrupt)?,
            run_millis: values[7].as_i64("run_millis").map_err(corrupt)?,
        })
    }

    /// Version key this row records.
    pub fn version_key(&self) -> MigrationResult<VersionKey> {
        match self.kind {
            MigrationKind::Repeatable => Ok(VersionKey::repeatable(self.version.clone())),
            _ => Ok(VersionKey::parse(&self.version)?),
        }
    }

    /// Refresh the row after a repeatable (or skip-checksum) migration re-ran.
    pub fn rerun(&mut self, checksum: i32, run_millis: i64, ran_by: &str, ran_on: DateTime<Utc>) {
        self.checksum = checksum;
        self.run_millis = run_millis;
        self.ran_by = ran_by.to_string();
        self.ran_on = ran_on;
    }

    /// Insert this row.
    pub fn insert(&self, conn: &dyn MigrationConnection, table: &str) -> DbResult<()> {
        let sql = format!(
            "insert into {table} ({HISTORY_COLUMNS}) values (?, ?, ?, ?, ?, ?, ?, ?)"
        );
        conn.execute(
            &sql,
            &[
                SqlValue::Int(i64::from(self.id)),
                SqlValue::Text(self.version.clone()),
                SqlValue::Text(self.kind.code().to_string()),
                SqlValue::Text(self.comment.clone()),
                SqlValue::Int(i64::from(self.checksum)),
                SqlValue::Text(self.ran_by.clone()),
                SqlValue::Timestamp(self.ran_on),
                SqlValue::Int(self.run_millis),
            ],
        )?;
        Ok(())
    }

    /// Persist checksum, run details and timing in place.
    pub fn update(&self, conn: &dyn MigrationConnection, table: &str) -> DbResult<()> {
        let sql = format!(
            "update {table} set checksum = ?, ran_by = ?, ran_on = ?, run_millis = ? where id = ?"
        );
        conn.execute(
            &sql,
            &[
                SqlValue::Int(i64::from(self.checksum)),
                SqlValue::Text(self.ran_by.clone()),
                SqlValue::Timestamp(self.ran_on),
                SqlValue::Int(self.run_millis),
                SqlValue::Int(i64::from(self.id)),
            ],
        )?;
        Ok(())
    }

    /// Persist only the checksum.
    pub fn update_checksum(&self, conn: &dyn MigrationConnection, table: &str) -> DbResult<()> {
        let sql = format!("update {table} set checksum = ? where id = ?");
        conn.execute(
            &sql,
            &[
                SqlValue::Int(i64::from(self.checksum)),
                SqlValue::Int(i64::from(self.id)),
            ],
        )?;
        Ok(())
    }
}

/// Load every history row ordered by id, locking rows where the platform
/// supports it.
pub fn load_rows(
    conn: &dyn MigrationConnection,
    platform_name: &str,
    table: &str,
) -> MigrationResult<Vec<HistoryRow>> {
    let sql = platform::locking_select(platform_name, HISTORY_COLUMNS, table);
    conn.query_rows(&sql, COLUMN_COUNT)?
        .iter()
        .map(|values| HistoryRow::from_values(values))
        .collect()
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
