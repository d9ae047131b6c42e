//! Optional creation and selection of the migration schema.

use crate::error::MigrationResult;
use st_core::MigrationConfig;
use st_db::{platform, MigrationConnection};

/// Create the configured schema when asked to, then make it the default.
pub fn create_and_set_if_needed(
    conn: &dyn MigrationConnection,
    config: &MigrationConfig,
) -> MigrationResult<()> {
    let Some(schema) = config.schema.as_deref() else {
        return Ok(());
    };
    let schema = platform::fold_identifier(conn, schema);
    if config.create_schema {
        log::debug!("Creating schema {schema} if needed");
        conn.create_schema_if_not_exists(&schema)?;
    }
    conn.set_schema(&schema)?;
    Ok(())
}
