// src/package/spec.rs

//! User-facing package selectors
//!
//! `PackageSpec` is what a user types on the command line
//! (`gaudi` or `gaudi-28.1-1`), `PackageFilter` is the regex triple used by
//! `query` and `list`.

use super::{Package, Requirement};
use crate::error::{Error, Result};
use crate::version::Comparator;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static NVR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+)-([0-9][0-9.]*)-([0-9]+)$").expect("static regex is valid")
});

/// Name with optional version and release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: String,
    pub version: Option<String>,
    pub release: Option<String>,
}

impl PackageSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            release: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>, release: Option<String>) -> Self {
        self.version = Some(version.into());
        self.release = release;
        self
    }

    /// Parse `name` or `name-<version>-<release>`
    ///
    /// Only dotted numeric versions and numeric releases are split off, so a
    /// name such as `lcg-cmake` is kept whole.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::ParseError("Empty package name".to_string()));
        }

        match NVR_RE.captures(s) {
            Some(caps) => Ok(Self {
                name: caps[1].to_string(),
                version: Some(caps[2].to_string()),
                release: Some(caps[3].to_string()),
            }),
            None => Ok(Self::new(s)),
        }
    }

    /// Requirement selecting this spec from a repository
    pub fn to_requirement(&self) -> Requirement {
        match self.version {
            Some(ref version) => Requirement::versioned(
                self.name.clone(),
                Comparator::Eq,
                version.clone(),
                self.release.clone(),
            ),
            None => Requirement::new(self.name.clone()),
        }
    }

    pub fn matches(&self, pkg: &Package) -> bool {
        pkg.name == self.name
            && self.version.as_ref().is_none_or(|v| *v == pkg.version)
            && self.release.as_ref().is_none_or(|r| *r == pkg.release)
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(ref version) = self.version {
            write!(f, "-{}", version)?;
        }
        if let Some(ref release) = self.release {
            write!(f, "-{}", release)?;
        }
        Ok(())
    }
}

/// Regex filters on name, version and release, anchored at the start
#[derive(Debug, Clone, Default)]
pub struct PackageFilter {
    name: Option<Regex>,
    version: Option<Regex>,
    release: Option<Regex>,
}

impl PackageFilter {
    pub fn new(name: Option<&str>, version: Option<&str>, release: Option<&str>) -> Result<Self> {
        let compile = |pattern: Option<&str>| -> Result<Option<Regex>> {
            pattern
                .map(|p| Regex::new(&format!("^(?:{})", p)).map_err(Error::from))
                .transpose()
        };

        Ok(Self {
            name: compile(name)?,
            version: compile(version)?,
            release: compile(release)?,
        })
    }

    /// Filter accepting everything
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, pkg: &Package) -> bool {
        self.name.as_ref().is_none_or(|re| re.is_match(&pkg.name))
            && self.version.as_ref().is_none_or(|re| re.is_match(&pkg.version))
            && self.release.as_ref().is_none_or(|re| re.is_match(&pkg.release))
    }
}
