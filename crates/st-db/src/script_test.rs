use super::*;
use crate::duckdb::DuckDbConnection;
use std::cell::RefCell;
use std::rc::Rc;

fn sql(text: &str) -> Statement {
    Statement::Sql(text.to_string())
}

#[test]
fn test_split_simple_statements() {
    let statements = split_statements("create table a (id int);\ninsert into a values (1);\n");
    assert_eq!(
        statements,
        vec![
            sql("create table a (id int)"),
            sql("insert into a values (1)")
        ]
    );
}

#[test]
fn test_split_trailing_statement_without_semicolon() {
    let statements = split_statements("select 1;\nselect 2");
    assert_eq!(statements, vec![sql("select 1"), sql("select 2")]);
}

#[test]
fn test_split_ignores_semicolons_in_quotes_and_comments() {
    let script = "insert into t values ('a;b', \"c;d\"); -- trailing; comment\n/* block; */ select 1;";
    let statements = split_statements(script);
    assert_eq!(statements.len(), 2);
    assert_eq!(statements[0], sql("insert into t values ('a;b', \"c;d\")"));
    assert_eq!(
        statements[1],
        sql("-- trailing; comment\n/* block; */ select 1")
    );
}

#[test]
fn test_split_escaped_single_quote() {
    let statements = split_statements("select 'it''s; fine';");
    assert_eq!(statements, vec![sql("select 'it''s; fine'")]);
}

#[test]
fn test_split_dollar_quoted_body() {
    let script = "create function f() returns int as $body$ begin; return 1; end; $body$ language plpgsql;\nselect $1;";
    let statements = split_statements(script);
    assert_eq!(statements.len(), 2);
    assert!(matches!(&statements[0], Statement::Sql(s) if s.ends_with("$body$ language plpgsql")));
    assert_eq!(statements[1], sql("select $1"));
}

#[test]
fn test_split_drops_comment_only_fragments() {
    let statements = split_statements("-- stratum:non-transactional\n-- nothing else\n");
    assert!(statements.is_empty());
}

#[test]
fn test_split_custom_commands() {
    let script = "create table a (id int);\n#seed   users 10;\nselect 1;\n#refresh";
    let statements = split_statements(script);
    assert_eq!(
        statements,
        vec![
            sql("create table a (id int)"),
            Statement::Command {
                name: "seed".to_string(),
                args: "users 10".to_string()
            },
            sql("select 1"),
            Statement::Command {
                name: "refresh".to_string(),
                args: String::new()
            },
        ]
    );
}

#[test]
fn test_executor_runs_statements_in_transaction() {
    let conn = DuckDbConnection::in_memory().unwrap();
    conn.begin().unwrap();
    StatementExecutor
        .run_script(
            &conn,
            false,
            "create table a (id int); insert into a values (1); insert into a values (2);",
            "V1",
            &CommandHandlers::new(),
        )
        .unwrap();
    conn.rollback().unwrap();
    assert!(!conn.table_exists(None, "a").unwrap());
}

#[test]
fn test_executor_auto_commit_rejects_open_transaction() {
    let conn = DuckDbConnection::in_memory().unwrap();
    conn.begin().unwrap();
    let err = StatementExecutor
        .run_script(&conn, true, "select 1;", "V1", &CommandHandlers::new())
        .unwrap_err();
    assert!(matches!(err, DbError::TransactionError(_)));
}

#[test]
fn test_executor_dispatches_commands() {
    let conn = DuckDbConnection::in_memory().unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let recorder = Rc::clone(&seen);

    let mut handlers = CommandHandlers::new();
    handlers.insert(
        "note".to_string(),
        Box::new(move |_: &dyn MigrationConnection, args: &str| -> DbResult<()> {
            recorder.borrow_mut().push(args.to_string());
            Ok(())
        }),
    );

    StatementExecutor
        .run_script(&conn, true, "select 1;\n#note hello world\n", "V1", &handlers)
        .unwrap();
    assert_eq!(*seen.borrow(), vec!["hello world".to_string()]);
}

#[test]
fn test_executor_unknown_command() {
    let conn = DuckDbConnection::in_memory().unwrap();
    let err = StatementExecutor
        .run_script(&conn, true, "#missing arg", "V1", &CommandHandlers::new())
        .unwrap_err();
    assert!(matches!(err, DbError::UnknownCommand(name) if name == "missing"));
}

#[test]
fn test_executor_reports_failing_statement() {
    let conn = DuckDbConnection::in_memory().unwrap();
    let err = StatementExecutor
        .run_script(
            &conn,
            true,
            "select 1; select broken syntax here;",
            "V7",
            &CommandHandlers::new(),
        )
        .unwrap_err();
    assert!(
        matches!(&err, DbError::ScriptFailed { script, statement: 2, .. } if script == "V7"),
        "{err}"
    );
    assert!(err.to_string().contains("V7 statement 2 failed"), "{err}");
}
