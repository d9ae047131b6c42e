//! Shared serde helper functions used across multiple modules.

use crate::version::VersionKey;
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;

/// One version as written in YAML. Unquoted `2` and `1.3` arrive as numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum VersionItem {
    Text(String),
    Int(u64),
    Float(f64),
}

impl VersionItem {
    /// Render back to text. Floats use `Debug` so `1.0` stays `1.0`; a float
    /// has already lost trailing zeros, so `1.10` must be quoted.
    fn into_text(self) -> String {
        match self {
            VersionItem::Text(s) => s,
            VersionItem::Int(n) => n.to_string(),
            VersionItem::Float(f) => format!("{f:?}"),
        }
    }
}

/// A version list written either as a YAML sequence or a single scalar,
/// where a string scalar may hold comma-separated entries.
#[derive(Deserialize)]
#[serde(untagged)]
enum VersionList {
    List(Vec<VersionItem>),
    One(VersionItem),
}

/// Deserialize a set of migration keys from `[1.1, m2_view]`, `"1.1,m2_view"`
/// or a bare `2`.
pub(crate) fn version_set<'de, D>(deserializer: D) -> Result<HashSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = match VersionList::deserialize(deserializer)? {
        VersionList::List(items) => items.into_iter().map(VersionItem::into_text).collect(),
        VersionList::One(VersionItem::Text(s)) => s.split(',').map(str::to_string).collect(),
        VersionList::One(item) => vec![item.into_text()],
    };
    Ok(normalise_keys(entries))
}

/// Normalise migration keys: versions render the way [`VersionKey`] renders
/// them (`1_2` becomes `1.2`), anything else is treated as a repeatable name.
pub(crate) fn normalise_keys<I, S>(entries: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .map(|e| e.as_ref().trim().to_string())
        .filter(|e| !e.is_empty())
        .map(|e| match VersionKey::parse(&e) {
            Ok(version) => version.as_str().to_string(),
            Err(_) => e,
        })
        .collect()
}
