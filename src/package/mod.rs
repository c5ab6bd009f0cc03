// src/package/mod.rs

//! Requirement and package model
//!
//! A [`Package`] is a concrete installable artifact. It provides its own name
//! at its own EVR, plus any extra [`Provide`] capabilities, and requires a
//! list of [`Requirement`]s. Packages compare equal on name, version and
//! release only; that identity is what de-duplication and the resolver's
//! granted set rely on.

mod spec;

pub use spec::{PackageFilter, PackageSpec};

use crate::error::{Error, Result};
use crate::version::{Comparator, Evr};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Suffix of artifacts handled by the default extractor
pub const ARTIFACT_SUFFIX: &str = "tar.gz";

/// A named, optionally versioned capability a package needs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default)]
    pub epoch: Option<u64>,
    #[serde(default, alias = "flags")]
    pub comparator: Comparator,
}

impl Requirement {
    /// Unversioned requirement on a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            release: None,
            epoch: None,
            comparator: Comparator::Any,
        }
    }

    pub fn versioned(
        name: impl Into<String>,
        comparator: Comparator,
        version: impl Into<String>,
        release: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
            release,
            epoch: None,
            comparator,
        }
    }

    /// Whether a capability `name` at `provided` satisfies this requirement
    ///
    /// A capability without a version satisfies any constraint on its name.
    /// The release only takes part in the comparison when both sides have one.
    pub fn is_satisfied_by(&self, name: &str, provided: Option<&Evr>) -> bool {
        if self.name != name {
            return false;
        }

        let (Some(version), Some(provided)) = (self.version.as_deref(), provided) else {
            return true;
        };
        if self.comparator == Comparator::Any {
            return true;
        }

        let required = Evr::new(
            self.epoch.unwrap_or(provided.epoch),
            version,
            self.release.clone(),
        );
        let ordering = match (&required.release, &provided.release) {
            (Some(_), Some(_)) => provided.cmp(&required),
            _ => provided.cmp_version(&required),
        };

        self.comparator.accepts(ordering)
    }

    /// A requirement needs a name, and a version whenever it constrains one
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::ResolutionError(
                "requirement without a name".to_string(),
            ));
        }
        if self.comparator != Comparator::Any
            && self.version.as_deref().is_none_or(|v| v.trim().is_empty())
        {
            return Err(Error::ResolutionError(format!(
                "requirement on {} has comparator {} but no version",
                self.name,
                self.comparator.as_str()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let (Some(version), false) = (&self.version, self.comparator == Comparator::Any) {
            write!(f, " {} ", self.comparator.symbol())?;
            if let Some(epoch) = self.epoch {
                write!(f, "{}:", epoch)?;
            }
            write!(f, "{}", version)?;
            if let Some(ref release) = self.release {
                write!(f, "-{}", release)?;
            }
        }
        Ok(())
    }
}

/// Extra capability declared by a package
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Provide {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default)]
    pub epoch: Option<u64>,
}

impl Provide {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            release: None,
            epoch: None,
        }
    }

    pub fn evr(&self) -> Option<Evr> {
        self.version
            .as_ref()
            .map(|v| Evr::new(self.epoch.unwrap_or(0), v.clone(), self.release.clone()))
    }
}

/// A concrete installable package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: String,
    pub release: String,
    #[serde(default)]
    pub epoch: u64,
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub requires: Vec<Requirement>,
    #[serde(default)]
    pub provides: Vec<Provide>,
    #[serde(default)]
    pub file_list: Vec<String>,
    /// Artifact location: a path, a `file://` URL or an `http(s)://` URL
    #[serde(default)]
    pub location: Option<String>,
    /// SHA-256 of the artifact, hex encoded
    #[serde(default)]
    pub checksum: Option<String>,
}

impl Package {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        release: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            release: release.into(),
            epoch: 0,
            arch: None,
            requires: Vec::new(),
            provides: Vec::new(),
            file_list: Vec::new(),
            location: None,
            checksum: None,
        }
    }

    pub fn with_requires(mut self, requires: Vec<Requirement>) -> Self {
        self.requires = requires;
        self
    }

    pub fn with_provides(mut self, provides: Vec<Provide>) -> Self {
        self.provides = provides;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn evr(&self) -> Evr {
        Evr::new(self.epoch, self.version.clone(), Some(self.release.clone()))
    }

    /// `name-version-release`, the identity shown to users
    pub fn nvr(&self) -> String {
        format!("{}-{}-{}", self.name, self.version, self.release)
    }

    /// Whether this package (or one of its provides) satisfies `req`
    pub fn fulfills(&self, req: &Requirement) -> bool {
        if req.is_satisfied_by(&self.name, Some(&self.evr())) {
            return true;
        }
        self.provides
            .iter()
            .any(|p| req.is_satisfied_by(&p.name, p.evr().as_ref()))
    }

    /// Same package name, ordered by EVR
    pub fn compare_version(&self, other: &Package) -> Ordering {
        self.evr().cmp(&other.evr())
    }

    /// File name of the artifact, from the location or derived from the NVR
    pub fn artifact_name(&self) -> String {
        if let Some(name) = self
            .location
            .as_deref()
            .and_then(|l| l.rsplit('/').next())
            .filter(|n| !n.is_empty())
        {
            return name.to_string();
        }

        match self.arch {
            Some(ref arch) => format!("{}.{}.{}", self.nvr(), arch, ARTIFACT_SUFFIX),
            None => format!("{}.{}", self.nvr(), ARTIFACT_SUFFIX),
        }
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.version == other.version && self.release == other.release
    }
}

impl Eq for Package {}

impl Hash for Package {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.version.hash(state);
        self.release.hash(state);
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.nvr())
    }
}

/// One requested package or several
#[derive(Debug, Clone)]
pub enum PackageOrList {
    Single(Package),
    List(Vec<Package>),
}

impl PackageOrList {
    pub fn into_vec(self) -> Vec<Package> {
        match self {
            PackageOrList::Single(p) => vec![p],
            PackageOrList::List(list) => list,
        }
    }
}

impl From<Package> for PackageOrList {
    fn from(p: Package) -> Self {
        PackageOrList::Single(p)
    }
}

impl From<Vec<Package>> for PackageOrList {
    fn from(list: Vec<Package>) -> Self {
        PackageOrList::List(list)
    }
}

impl From<&[Package]> for PackageOrList {
    fn from(list: &[Package]) -> Self {
        PackageOrList::List(list.to_vec())
    }
}
