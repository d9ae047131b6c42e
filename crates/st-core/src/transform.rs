//! Placeholder substitution for migration scripts.
//!
//! Placeholders are written `${key}`. Keys without a configured value are left
//! untouched so a script can still contain literal `${...}` text.

use crate::error::{CoreError, CoreResult};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z0-9_.\-]+)\}").expect("placeholder regex is valid")
    })
}

/// Replaces `${key}` tokens with configured values.
#[derive(Debug, Clone, Default)]
pub struct ScriptTransform {
    placeholders: HashMap<String, String>,
}

impl ScriptTransform {
    /// Create a transform over the given placeholder map.
    pub fn new(placeholders: HashMap<String, String>) -> Self {
        Self { placeholders }
    }

    /// Build from a `k=v;k2=v2` string merged with a map; map entries win.
    pub fn build(
        run_placeholders: Option<&str>,
        placeholder_map: &HashMap<String, String>,
    ) -> CoreResult<Self> {
        let mut placeholders = match run_placeholders {
            Some(s) => parse_placeholders(s)?,
            None => HashMap::new(),
        };
        placeholders.extend(
            placeholder_map
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        Ok(Self::new(placeholders))
    }

    /// Return true when no placeholders are configured.
    pub fn is_empty(&self) -> bool {
        self.placeholders.is_empty()
    }

    /// Substitute all known placeholders in `script`.
    pub fn transform(&self, script: &str) -> String {
        if self.placeholders.is_empty() {
            return script.to_string();
        }
        placeholder_regex()
            .replace_all(script, |caps: &Captures<'_>| {
                match self.placeholders.get(&caps[1]) {
                    Some(value) => value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// Replace every occurrence of a literal token.
    pub fn replace(token: &str, value: &str, text: &str) -> String {
        text.replace(token, value)
    }
}

/// Parse `k=v` pairs separated by `;` or `,`.
pub fn parse_placeholders(s: &str) -> CoreResult<HashMap<String, String>> {
    let mut map = HashMap::new();
    for entry in s.split([';', ',']) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| CoreError::InvalidPlaceholder {
                entry: entry.to_string(),
            })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(CoreError::InvalidPlaceholder {
                entry: entry.to_string(),
            });
        }
        map.insert(key.to_string(), value.trim().to_string());
    }
    Ok(map)
}

#[cfg(test)]
#[path = "transform_test.rs"]
mod tests;
