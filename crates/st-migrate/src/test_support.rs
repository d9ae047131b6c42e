//! Shared fixtures for unit tests.

use st_db::{CommandHandlers, DbResult, MigrationConnection, ScriptExecutor, StatementExecutor};
use std::cell::RefCell;
use std::rc::Rc;

const RUN_PREFIX: &str = "run migration version: ";

/// Executor that records each call before delegating to [`StatementExecutor`].
#[derive(Clone, Default)]
pub(crate) struct RecordingExecutor {
    calls: Rc<RefCell<Vec<(String, bool)>>>,
}

impl RecordingExecutor {
    /// Versions executed so far, in order.
    pub(crate) fn versions(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|(desc, _)| desc.strip_prefix(RUN_PREFIX).map(String::from))
            .collect()
    }

    /// Versions executed in auto-commit mode.
    pub(crate) fn auto_commit_versions(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|(_, auto_commit)| *auto_commit)
            .filter_map(|(desc, _)| desc.strip_prefix(RUN_PREFIX).map(String::from))
            .collect()
    }

    pub(crate) fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl ScriptExecutor for RecordingExecutor {
    fn run_script(
        &self,
        conn: &dyn MigrationConnection,
        auto_commit: bool,
        script: &str,
        description: &str,
        handlers: &CommandHandlers,
    ) -> DbResult<()> {
        self.calls
            .borrow_mut()
            .push((description.to_string(), auto_commit));
        StatementExecutor.run_script(conn, auto_commit, script, description, handlers)
    }
}
