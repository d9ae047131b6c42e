//! Migration version keys.
//!
//! A [`VersionKey`] is either a versioned key made of numeric parts
//! (`1`, `1.2`, `1_2_3`) or a repeatable key made of a free-form name
//! (`m2_view`). Versioned keys order numerically part by part; repeatable keys
//! always order after every versioned key.

use crate::error::{CoreError, CoreResult};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// Comparable, string-renderable identifier of a migration.
///
/// Equality is defined by the rendered key, which is also the value stored in
/// the history table.
#[derive(Debug, Clone)]
pub struct VersionKey {
    key: String,
    parts: Option<Vec<u64>>,
}

impl VersionKey {
    /// Parse a versioned key. Underscores are accepted as separators and
    /// rendered as dots.
    pub fn parse(version: &str) -> CoreResult<Self> {
        let normalised = version.trim().replace('_', ".");
        if normalised.is_empty() {
            return Err(CoreError::InvalidVersion {
                version: version.to_string(),
            });
        }
        let parts = normalised
            .split('.')
            .map(|p| p.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| CoreError::InvalidVersion {
                version: version.to_string(),
            })?;
        Ok(Self {
            key: normalised,
            parts: Some(parts),
        })
    }

    /// Create a repeatable key from a migration name.
    pub fn repeatable(name: impl Into<String>) -> Self {
        Self {
            key: name.into(),
            parts: None,
        }
    }

    /// Return true for repeatable keys.
    pub fn is_repeatable(&self) -> bool {
        self.parts.is_none()
    }

    /// Return the rendered key.
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Numeric parts of a versioned key; empty for repeatable keys.
    pub fn parts(&self) -> &[u64] {
        self.parts.as_deref().unwrap_or(&[])
    }

    /// Compare numeric parts only, ignoring how the key was written: `2`,
    /// `2.0` and `2_0_0` are equal here although they are distinct keys.
    pub fn cmp_numeric(&self, other: &Self) -> Ordering {
        Self::compare_parts(self.parts(), other.parts())
    }

    fn compare_parts(a: &[u64], b: &[u64]) -> Ordering {
        let len = a.len().max(b.len());
        for i in 0..len {
            let left = a.get(i).copied().unwrap_or(0);
            let right = b.get(i).copied().unwrap_or(0);
            match left.cmp(&right) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }
}

impl PartialEq for VersionKey {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.is_repeatable() == other.is_repeatable()
    }
}

impl Eq for VersionKey {}

impl Ord for VersionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.parts, &other.parts) {
            (Some(a), Some(b)) => {
                Self::compare_parts(a, b).then_with(|| self.key.cmp(&other.key))
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.key.cmp(&other.key),
        }
    }
}

impl PartialOrd for VersionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl AsRef<str> for VersionKey {
    fn as_ref(&self) -> &str {
        &self.key
    }
}

impl Serialize for VersionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.key)
    }
}

#[cfg(test)]
#[path = "version_test.rs"]
mod tests;
