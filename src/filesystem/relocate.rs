// src/filesystem/relocate.rs

//! Prefix relocation for artifact contents
//!
//! Artifacts are built for a fixed prefix (say `/opt/LHCbSoft`); the install
//! area may want them somewhere else (`/lhcb`). A [`RelocationMap`] rewrites
//! the leading part of every entry path. The longest matching prefix wins and
//! prefixes only match on whole path components.

use super::path::normalize_entry_path;
use crate::error::Result;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelocationMap {
    // (from, to), longest `from` first
    rules: Vec<(String, String)>,
}

impl RelocationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `from -> to` pairs; both sides are normalised
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut map = Self::new();
        for (from, to) in pairs {
            map.insert(from.as_ref(), to.as_ref())?;
        }
        Ok(map)
    }

    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self> {
        Self::from_pairs(map.iter())
    }

    pub fn insert(&mut self, from: &str, to: &str) -> Result<()> {
        let from = normalize_prefix(from)?;
        let to = normalize_prefix(to)?;

        self.rules.retain(|(f, _)| *f != from);
        self.rules.push((from, to));
        self.rules.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Relocate a normalised path, returning the new path and whether a
    /// rule applied
    pub fn relocate(&self, path: &str) -> (String, bool) {
        for (from, to) in &self.rules {
            if let Some(rest) = strip_component_prefix(path, from) {
                let base = to.trim_end_matches('/');
                let relocated = format!("{}{}", base, rest);
                let relocated = if relocated.is_empty() {
                    "/".to_string()
                } else {
                    relocated
                };
                return (relocated, true);
            }
        }
        (path.to_string(), false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rules.iter().map(|(f, t)| (f.as_str(), t.as_str()))
    }
}

fn normalize_prefix(prefix: &str) -> Result<String> {
    if prefix.trim_matches(|c| c == '/' || c == '.').is_empty() {
        return Ok("/".to_string());
    }
    normalize_entry_path(prefix)
}

/// Remainder of `path` after `prefix`, starting with `/` or empty
fn strip_component_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix == "/" {
        return Some(if path == "/" { "" } else { path });
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}
