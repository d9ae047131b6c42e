use super::*;

#[test]
fn test_parse_dotted_version() {
    let v = VersionKey::parse("1.2.3").unwrap();
    assert_eq!(v.as_str(), "1.2.3");
    assert_eq!(v.parts(), &[1, 2, 3]);
    assert!(!v.is_repeatable());
}

#[test]
fn test_parse_underscore_version_renders_dots() {
    let v = VersionKey::parse("1_10").unwrap();
    assert_eq!(v.to_string(), "1.10");
    assert_eq!(v, VersionKey::parse("1.10").unwrap());
}

#[test]
fn test_parse_rejects_non_numeric() {
    assert!(VersionKey::parse("1.a").is_err());
    assert!(VersionKey::parse("").is_err());
    assert!(VersionKey::parse("1..2").is_err());
}

#[test]
fn test_numeric_ordering() {
    let mut versions: Vec<VersionKey> = ["1.10", "1.2", "2", "1.2.1", "1"]
        .iter()
        .map(|v| VersionKey::parse(v).unwrap())
        .collect();
    versions.sort();
    let rendered: Vec<&str> = versions.iter().map(|v| v.as_str()).collect();
    assert_eq!(rendered, vec!["1", "1.2", "1.2.1", "1.10", "2"]);
}

#[test]
fn test_missing_parts_order_as_zero() {
    let a = VersionKey::parse("1").unwrap();
    let b = VersionKey::parse("1.0").unwrap();
    let c = VersionKey::parse("1.0.1").unwrap();
    assert_ne!(a, b);
    assert!(a < c);
    assert!(b < c);
}

#[test]
fn test_repeatable_orders_after_versioned() {
    let view = VersionKey::repeatable("m2_view");
    let big = VersionKey::parse("999.999").unwrap();
    assert!(view.is_repeatable());
    assert!(big < view);
    assert!(VersionKey::repeatable("a_view") < view);
}

#[test]
fn test_repeatable_never_equals_versioned_with_same_text() {
    assert_ne!(VersionKey::repeatable("1"), VersionKey::parse("1").unwrap());
}

#[test]
fn test_cmp_numeric_ignores_rendering() {
    let two = VersionKey::parse("2").unwrap();
    let two_zero = VersionKey::parse("2.0").unwrap();
    assert_eq!(two.cmp_numeric(&two_zero), Ordering::Equal);
    assert!(two < two_zero);
    assert_eq!(
        VersionKey::parse("2.1").unwrap().cmp_numeric(&two),
        Ordering::Greater
    );
}
