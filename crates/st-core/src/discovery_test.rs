use super::*;
use crate::resource::MigrationKind;

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_directory_source_orders_by_version() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "1.10__late.sql", "select 10;");
    write(dir.path(), "V1.2__add_orders.sql", "select 2;");
    write(dir.path(), "R__order_view.sql", "select 'view';");
    write(dir.path(), "1.1__initial.sql", "select 1;");
    write(dir.path(), "README.md", "not a migration");

    let source = DirectorySource::new(dir.path(), None);
    let versions = source.versions().unwrap();
    let keys: Vec<&str> = versions.iter().map(|r| r.key()).collect();
    assert_eq!(keys, vec!["1.1", "1.2", "1.10", "order_view"]);

    assert_eq!(versions[1].comment, "add orders");
    assert_eq!(versions[1].kind, MigrationKind::Versioned);
    assert_eq!(versions[3].kind, MigrationKind::Repeatable);
    assert!(versions[0].location.ends_with("1.1__initial.sql"));
    assert!(source.init_versions().unwrap().is_empty());
}

#[test]
fn test_directory_source_recurses() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("2024");
    std::fs::create_dir(&nested).unwrap();
    write(dir.path(), "1__first.sql", "select 1;");
    write(&nested, "2__second.sql", "select 2;");

    let versions = DirectorySource::new(dir.path(), None).versions().unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[1].key(), "2");
}

#[test]
fn test_missing_directory_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let source = DirectorySource::new(dir.path().join("nope"), Some(dir.path().join("init")));
    assert!(source.versions().unwrap().is_empty());
    assert!(source.init_versions().unwrap().is_empty());
}

#[test]
fn test_init_directory() {
    let dir = tempfile::tempdir().unwrap();
    let init = dir.path().join("init");
    std::fs::create_dir(&init).unwrap();
    write(&init, "I1.0__baseline.sql", "create table a (id int);");
    write(&init, "2.0__baseline.sql", "create table a (id int);");

    let source = DirectorySource::new(dir.path(), Some(init));
    let inits = source.init_versions().unwrap();
    assert_eq!(inits.len(), 2);
    assert!(inits.iter().all(|r| r.kind == MigrationKind::Init));
    assert_eq!(inits.last().unwrap().key(), "2.0");
}

#[test]
fn test_repeatable_rejected_in_init_directory() {
    let path = Path::new("init/R__view.sql");
    assert!(parse_resource(path, String::new(), true).is_err());
}

#[test]
fn test_duplicate_versions_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "1.1__a.sql", "select 1;");
    write(dir.path(), "V1_1__b.sql", "select 2;");
    let result = DirectorySource::new(dir.path(), None).versions();
    assert!(matches!(result, Err(CoreError::DuplicateVersion { .. })));
}

#[test]
fn test_invalid_version_rejected() {
    let path = Path::new("V1.x__broken.sql");
    assert!(matches!(
        parse_resource(path, String::new(), false),
        Err(CoreError::InvalidVersion { .. })
    ));
}

#[test]
fn test_non_transactional_directive_detected() {
    let path = Path::new("3__concurrent_index.sql");
    let content = "-- stratum:non-transactional\ncreate index concurrently ix on t (c);";
    let resource = parse_resource(path, content.to_string(), false).unwrap();
    assert!(resource.non_transactional);
}

#[test]
fn test_static_source_sorts() {
    let source = StaticSource::new(vec![
        MigrationResource::repeatable("v_orders", "select 1").unwrap(),
        MigrationResource::versioned("2", "second", "select 2").unwrap(),
        MigrationResource::versioned("1", "first", "select 1").unwrap(),
    ]);
    let keys: Vec<String> = source
        .versions()
        .unwrap()
        .iter()
        .map(|r| r.key().to_string())
        .collect();
    assert_eq!(keys, vec!["1", "2", "v_orders"]);
}
