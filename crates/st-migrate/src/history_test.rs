use super::*;
use chrono::TimeZone;
use st_db::DuckDbConnection;

fn create_table(conn: &DuckDbConnection) {
    let ddl = platform::ddl_template_for("duckdb")
        .unwrap()
        .replace("${table}", "db_migration")
        .replace("${pk_table}", "pk_db_migration");
    conn.execute_batch(&ddl).unwrap();
}

fn row(id: i32, version: &str) -> HistoryRow {
    HistoryRow {
        id,
        kind: MigrationKind::Versioned,
        version: version.to_string(),
        comment: format!("migration {version}"),
        checksum: -42,
        ran_by: "deployer".to_string(),
        ran_on: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        run_millis: 15,
    }
}

#[test]
fn test_insert_and_load() {
    let conn = DuckDbConnection::in_memory().unwrap();
    create_table(&conn);

    row(2, "1.1").insert(&conn, "db_migration").unwrap();
    row(1, "1.0").insert(&conn, "db_migration").unwrap();

    let rows = load_rows(&conn, "duckdb", "db_migration").unwrap();
    assert_eq!(rows, vec![row(1, "1.0"), row(2, "1.1")]);
}

#[test]
fn test_update_in_place() {
    let conn = DuckDbConnection::in_memory().unwrap();
    create_table(&conn);
    let mut original = row(1, "1.0");
    original.insert(&conn, "db_migration").unwrap();

    let later = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
    original.rerun(99, 250, "ci", later);
    original.update(&conn, "db_migration").unwrap();

    let rows = load_rows(&conn, "duckdb", "db_migration").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, 1);
    assert_eq!(rows[0].checksum, 99);
    assert_eq!(rows[0].run_millis, 250);
    assert_eq!(rows[0].ran_by, "ci");
    assert_eq!(rows[0].ran_on, later);
}

#[test]
fn test_update_checksum_only() {
    let conn = DuckDbConnection::in_memory().unwrap();
    create_table(&conn);
    let mut original = row(1, "1.0");
    original.insert(&conn, "db_migration").unwrap();

    original.checksum = 7;
    original.update_checksum(&conn, "db_migration").unwrap();

    let loaded = &load_rows(&conn, "duckdb", "db_migration").unwrap()[0];
    assert_eq!(loaded.checksum, 7);
    assert_eq!(loaded.run_millis, 15);
    assert_eq!(loaded.ran_by, "deployer");
}

#[test]
fn test_from_values_rejects_unknown_type() {
    let values = vec![
        SqlValue::Int(1),
        SqlValue::Text("1.0".to_string()),
        SqlValue::Text("X".to_string()),
        SqlValue::Text(String::new()),
        SqlValue::Int(0),
        SqlValue::Text("me".to_string()),
        SqlValue::Timestamp(Utc::now()),
        SqlValue::Int(0),
    ];
    let err = HistoryRow::from_values(&values).unwrap_err();
    assert!(matches!(err, MigrationError::CorruptHistory(_)));
}

#[test]
fn test_from_values_rejects_short_row() {
    let err = HistoryRow::from_values(&[SqlValue::Int(1)]).unwrap_err();
    assert!(matches!(err, MigrationError::CorruptHistory(_)));
}

#[test]
fn test_version_key() {
    let mut repeatable = row(3, "v_orders");
    repeatable.kind = MigrationKind::Repeatable;
    assert!(repeatable.version_key().unwrap().is_repeatable());
    assert_eq!(row(1, "1.2").version_key().unwrap().parts(), &[1, 2]);
}
