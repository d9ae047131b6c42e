//! Splitting migration scripts into statements and executing them.

use crate::error::{DbError, DbResult};
use crate::traits::MigrationConnection;
use std::collections::HashMap;

/// One executable unit of a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Plain SQL, without the terminating `;`
    Sql(String),
    /// A `#name args` directive line
    Command { name: String, args: String },
}

/// Handler for a `#name args` directive embedded in a script.
pub trait CustomCommandHandler {
    fn handle(&self, conn: &dyn MigrationConnection, args: &str) -> DbResult<()>;
}

impl<F> CustomCommandHandler for F
where
    F: Fn(&dyn MigrationConnection, &str) -> DbResult<()>,
{
    fn handle(&self, conn: &dyn MigrationConnection, args: &str) -> DbResult<()> {
        self(conn, args)
    }
}

/// Registered command handlers keyed by command name (without the `#`).
pub type CommandHandlers = HashMap<String, Box<dyn CustomCommandHandler>>;

/// Executes the text of one migration against an open connection.
pub trait ScriptExecutor {
    /// Run `script`.
    ///
    /// With `auto_commit` each statement commits on its own and the caller
    /// must not hold an open transaction; otherwise all statements join the
    /// caller's transaction.
    fn run_script(
        &self,
        conn: &dyn MigrationConnection,
        auto_commit: bool,
        script: &str,
        description: &str,
        handlers: &CommandHandlers,
    ) -> DbResult<()>;
}

/// Default executor: split into statements and run them one at a time.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatementExecutor;

impl ScriptExecutor for StatementExecutor {
    fn run_script(
        &self,
        conn: &dyn MigrationConnection,
        auto_commit: bool,
        script: &str,
        description: &str,
        handlers: &CommandHandlers,
    ) -> DbResult<()> {
        if auto_commit && conn.in_transaction() {
            return Err(DbError::TransactionError(format!(
                "{description}: auto-commit execution requested inside an open transaction"
            )));
        }

        let statements = split_statements(script);
        log::debug!("{description}: executing {} statement(s)", statements.len());

        for (idx, statement) in statements.iter().enumerate() {
            match statement {
                Statement::Sql(sql) => {
                    conn.execute_batch(sql).map_err(|e| match e {
                        DbError::ExecutionError(message) => DbError::ScriptFailed {
                            script: description.to_string(),
                            statement: idx + 1,
                            message,
                        },
                        other => other,
                    })?;
                }
                Statement::Command { name, args } => {
                    let handler = handlers
                        .get(name)
                        .ok_or_else(|| DbError::UnknownCommand(name.clone()))?;
                    log::debug!("{description}: running command #{name}");
                    handler.handle(conn, args)?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Normal,
    SingleQuote,
    DoubleQuote,
    LineComment,
    BlockComment,
    Dollar(String),
}

/// Split script text into `;`-terminated statements and `#` command lines.
///
/// Semicolons inside quotes, comments and `$tag$` bodies do not terminate a
/// statement. Fragments holding nothing but comments are dropped.
pub fn split_statements(script: &str) -> Vec<Statement> {
    let chars: Vec<char> = script.chars().collect();
    let mut statements = Vec::new();
    let mut buf = String::new();
    let mut has_code = false;
    let mut line_start = true;
    let mut state = State::Normal;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match &state {
            State::Normal => {
                if c == '#' && line_start && !has_code {
                    let end = chars[i..]
                        .iter()
                        .position(|&ch| ch == '\n')
                        .map_or(chars.len(), |p| i + p);
                    let line: String = chars[i + 1..end].iter().collect();
                    let line = line.trim();
                    let (name, args) = match line.split_once(char::is_whitespace) {
                        Some((name, args)) => (name, args.trim()),
                        None => (line, ""),
                    };
                    if !name.is_empty() {
                        statements.push(Statement::Command {
                            name: name.to_string(),
                            args: args.trim_end_matches(';').trim_end().to_string(),
                        });
                    }
                    buf.clear();
                    i = end;
                    continue;
                }
                match c {
                    ';' => {
                        push_sql(&mut statements, &buf, has_code);
                        buf.clear();
                        has_code = false;
                        i += 1;
                        line_start = false;
                        continue;
                    }
                    '\'' => state = State::SingleQuote,
                    '"' => state = State::DoubleQuote,
                    '-' if next == Some('-') => state = State::LineComment,
                    '/' if next == Some('*') => state = State::BlockComment,
                    '$' => {
                        if let Some(tag) = dollar_tag(&chars[i..]) {
                            buf.push_str(&tag);
                            i += tag.chars().count();
                            state = State::Dollar(tag);
                            has_code = true;
                            line_start = false;
                            continue;
                        }
                    }
                    _ => {}
                }
                if !c.is_whitespace() && !matches!(state, State::LineComment | State::BlockComment)
                {
                    has_code = true;
                }
            }
            State::SingleQuote => {
                if c == '\'' {
                    state = State::Normal;
                }
            }
            State::DoubleQuote => {
                if c == '"' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if c == '\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if c == '*' && next == Some('/') {
                    buf.push_str("*/");
                    i += 2;
                    state = State::Normal;
                    line_start = false;
                    continue;
                }
            }
            State::Dollar(tag) => {
                let tag_len = tag.chars().count();
                if c == '$' && chars[i..].iter().take(tag_len).copied().eq(tag.chars()) {
                    let tag = tag.clone();
                    buf.push_str(&tag);
                    i += tag_len;
                    state = State::Normal;
                    line_start = false;
                    continue;
                }
            }
        }

        buf.push(c);
        if c == '\n' {
            line_start = true;
        } else if !c.is_whitespace() {
            line_start = false;
        }
        i += 1;
    }

    push_sql(&mut statements, &buf, has_code);
    statements
}

fn push_sql(statements: &mut Vec<Statement>, buf: &str, has_code: bool) {
    let sql = buf.trim();
    if has_code && !sql.is_empty() {
        statements.push(Statement::Sql(sql.to_string()));
    }
}

/// Match an opening `$tag$` (tag may be empty) at the start of `chars`.
fn dollar_tag(chars: &[char]) -> Option<String> {
    let mut tag = String::from("$");
    for (idx, &c) in chars.iter().enumerate().skip(1) {
        if c == '$' {
            tag.push('$');
            return Some(tag);
        }
        let valid = c == '_' || c.is_ascii_alphabetic() || (idx > 1 && c.is_ascii_digit());
        if !valid {
            return None;
        }
        tag.push(c);
    }
    None
}

#[cfg(test)]
#[path = "script_test.rs"]
mod tests;
