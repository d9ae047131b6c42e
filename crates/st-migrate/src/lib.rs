//! st-migrate - Migration engine for Stratum
//!
//! Loads the migration history under lock, decides per discovered script
//! whether to skip, patch, execute or fail, and drives the transaction around
//! it all.

pub mod error;
pub mod history;
pub mod runner;
pub mod schema;
pub mod table;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{MigrationError, MigrationResult};
pub use history::HistoryRow;
pub use runner::{MigrationReport, MigrationRunner};
pub use table::{MigrationOutcome, MigrationTable, Outcome, TableOptions};
