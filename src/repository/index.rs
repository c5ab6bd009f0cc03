// src/repository/index.rs

//! JSON package index
//!
//! An index is a JSON document listing the packages a repository offers:
//!
//! ```json
//! { "packages": [
//!     { "name": "gaudi", "version": "28.1", "release": "1",
//!       "location": "rpms/gaudi-28.1-1.tar.gz", "checksum": "…",
//!       "requires": [ { "name": "root", "version": "6.0", "comparator": "GE" } ],
//!       "provides": [ { "name": "gaudi-python" } ] } ] }
//! ```
//!
//! Relative locations are resolved against the index's own location. A
//! source may name the index file itself or a directory holding
//! `index.json`.

use super::Repository;
use super::client::RepositoryClient;
use crate::error::{Error, Result};
use crate::package::{Package, PackageFilter, Requirement};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// File name looked up when a source points at a directory
pub const INDEX_FILE_NAME: &str = "index.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryIndex {
    #[serde(default)]
    pub packages: Vec<Package>,
}

/// Where an index lives
#[derive(Debug, Clone, PartialEq, Eq)]
enum IndexSource {
    Remote(Url),
    Local(PathBuf),
}

impl IndexSource {
    fn parse(source: &str) -> Result<Self> {
        match Url::parse(source) {
            Ok(url) if url.scheme() == "file" => {
                let path = url.to_file_path().map_err(|_| {
                    Error::ConfigError(format!("Invalid file URL '{}'", source))
                })?;
                Ok(Self::local(path))
            }
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                if url.path().ends_with('/') {
                    let url = url.join(INDEX_FILE_NAME).map_err(|e| {
                        Error::ConfigError(format!("Invalid repository URL '{}': {}", source, e))
                    })?;
                    Ok(IndexSource::Remote(url))
                } else {
                    Ok(IndexSource::Remote(url))
                }
            }
            _ => Ok(Self::local(PathBuf::from(source))),
        }
    }

    fn local(path: PathBuf) -> Self {
        if path.is_dir() {
            IndexSource::Local(path.join(INDEX_FILE_NAME))
        } else {
            IndexSource::Local(path)
        }
    }

    /// Resolve an artifact location found in this index
    fn resolve_location(&self, location: &str) -> Result<String> {
        if has_url_scheme(location) || Path::new(location).is_absolute() {
            return Ok(location.to_string());
        }

        match self {
            IndexSource::Remote(url) => url
                .join(location)
                .map(|u| u.to_string())
                .map_err(|e| Error::ParseError(format!("Invalid location '{}': {}", location, e))),
            IndexSource::Local(path) => {
                let base = path.parent().unwrap_or_else(|| Path::new("."));
                Ok(base.join(location).display().to_string())
            }
        }
    }
}

fn has_url_scheme(location: &str) -> bool {
    Url::parse(location)
        .map(|u| matches!(u.scheme(), "http" | "https" | "file"))
        .unwrap_or(false)
}

/// Repository backed by one or more JSON indexes held in memory
#[derive(Debug, Clone, Default)]
pub struct IndexRepository {
    packages: Vec<Package>,
}

impl IndexRepository {
    pub fn from_packages(packages: Vec<Package>) -> Self {
        Self { packages }
    }

    /// Load and merge the indexes of all `sources`, in order
    pub fn load(sources: &[String]) -> Result<Self> {
        let mut client = None;
        let mut packages = Vec::new();

        for source in sources {
            let source = IndexSource::parse(source)?;
            let text = match source {
                IndexSource::Remote(ref url) => {
                    if client.is_none() {
                        client = Some(RepositoryClient::new()?);
                    }
                    client
                        .as_ref()
                        .ok_or_else(|| Error::InitError("HTTP client unavailable".to_string()))?
                        .fetch_text(url.as_str())?
                }
                IndexSource::Local(ref path) => fs::read_to_string(path).map_err(|e| {
                    Error::NotFoundError(format!(
                        "Cannot read repository index {}: {}",
                        path.display(),
                        e
                    ))
                })?,
            };

            let index: RepositoryIndex = serde_json::from_str(&text).map_err(|e| {
                Error::ParseError(format!("Invalid repository index {:?}: {}", source, e))
            })?;
            debug!("Loaded {} packages from {:?}", index.packages.len(), source);

            for mut pkg in index.packages {
                if let Some(ref location) = pkg.location {
                    pkg.location = Some(source.resolve_location(location)?);
                }
                packages.push(pkg);
            }
        }

        info!("Repository index holds {} packages", packages.len());
        Ok(Self { packages })
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl Repository for IndexRepository {
    fn find_latest_matching(&self, req: &Requirement) -> Result<Option<Package>> {
        let mut best: Option<&Package> = None;
        for pkg in self.packages.iter().filter(|p| p.fulfills(req)) {
            best = match best {
                Some(current) if current.compare_version(pkg).is_ge() => Some(current),
                _ => Some(pkg),
            };
        }
        Ok(best.cloned())
    }

    fn list_packages(&self, filter: &PackageFilter) -> Result<Vec<Package>> {
        Ok(self
            .packages
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }
}
