use super::*;
use chrono::{TimeZone, Utc};

#[test]
fn test_in_memory_connection() {
    let db = DuckDbConnection::in_memory().unwrap();
    assert!(!db.in_transaction());
    assert!(!db.table_exists(None, "missing").unwrap());
}

#[test]
fn test_execute_and_query_round_trip() {
    let db = DuckDbConnection::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id INTEGER, name VARCHAR, run_on TIMESTAMP)")
        .unwrap();

    let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
    let inserted = db
        .execute(
            "INSERT INTO t VALUES (?, ?, ?)",
            &[
                SqlValue::Int(7),
                SqlValue::Text("seven".to_string()),
                SqlValue::Timestamp(ts),
            ],
        )
        .unwrap();
    assert_eq!(inserted, 1);

    let rows = db.query_rows("SELECT id, name, run_on FROM t", 3).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0].as_i64("id").unwrap(), 7);
    assert_eq!(rows[0][1].as_text(), "seven");
    assert_eq!(rows[0][2].as_timestamp("run_on").unwrap(), ts);
}

#[test]
fn test_null_values() {
    let db = DuckDbConnection::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (name VARCHAR)").unwrap();
    db.execute("INSERT INTO t VALUES (?)", &[SqlValue::Null])
        .unwrap();
    let rows = db.query_rows("SELECT name FROM t", 1).unwrap();
    assert_eq!(rows[0][0], SqlValue::Null);
}

#[test]
fn test_rollback_discards_work() {
    let db = DuckDbConnection::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id INTEGER)").unwrap();

    db.begin().unwrap();
    assert!(db.in_transaction());
    db.execute_batch("INSERT INTO t VALUES (1)").unwrap();
    db.rollback().unwrap();
    assert!(!db.in_transaction());

    let rows = db.query_rows("SELECT COUNT(*) FROM t", 1).unwrap();
    assert_eq!(rows[0][0].as_i64("count").unwrap(), 0);
}

#[test]
fn test_rollback_without_transaction_is_noop() {
    let db = DuckDbConnection::in_memory().unwrap();
    db.rollback().unwrap();
}

#[test]
fn test_commit_keeps_work() {
    let db = DuckDbConnection::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id INTEGER)").unwrap();
    db.begin().unwrap();
    db.execute_batch("INSERT INTO t VALUES (1)").unwrap();
    db.commit().unwrap();

    let rows = db.query_rows("SELECT COUNT(*) FROM t", 1).unwrap();
    assert_eq!(rows[0][0].as_i64("count").unwrap(), 1);
}

#[test]
fn test_table_exists_in_schema() {
    let db = DuckDbConnection::in_memory().unwrap();
    db.create_schema_if_not_exists("app").unwrap();
    db.execute_batch("CREATE TABLE app.history (id INTEGER)")
        .unwrap();

    assert!(db.table_exists(Some("app"), "history").unwrap());
    assert!(!db.table_exists(None, "history").unwrap());

    db.set_schema("app").unwrap();
    assert!(db.table_exists(None, "history").unwrap());
}

#[test]
fn test_missing_table_error() {
    let db = DuckDbConnection::in_memory().unwrap();
    let err = db.execute_batch("SELECT * FROM nope").unwrap_err();
    assert!(
        matches!(&err, DbError::ExecutionError(msg) if msg.contains("nope")),
        "{err}"
    );
}

#[test]
fn test_pool_shares_in_memory_database() {
    let pool = DuckDbPool::in_memory().unwrap();
    let first = pool.connect().unwrap();
    first.execute_batch("CREATE TABLE shared (id INTEGER)").unwrap();
    first.close().unwrap();

    let second = pool.connect().unwrap();
    assert!(second.table_exists(None, "shared").unwrap());
}

#[test]
fn test_driver_opens_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.duckdb");
    let driver = DuckDbDriver::new(path.to_string_lossy());

    let conn = driver.connect().unwrap();
    conn.execute_batch("CREATE TABLE t (id INTEGER)").unwrap();
    conn.close().unwrap();

    let conn = driver.connect().unwrap();
    assert!(conn.table_exists(None, "t").unwrap());
}
