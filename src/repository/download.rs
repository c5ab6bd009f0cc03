// src/repository/download.rs

//! Artifact fetching and integrity checks
//!
//! [`ArtifactFetcher`] is the seam the installer uses to obtain an artifact
//! for a package and to judge whether a copy on disk can be trusted.
//! [`DefaultFetcher`] copies local and `file://` artifacts and downloads
//! `http(s)://` ones.

use super::client::RepositoryClient;
use crate::error::{Error, Result};
use crate::hash;
use crate::package::Package;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use url::Url;

/// Result of checking an artifact against its package metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Valid,
    Invalid(String),
    /// No checksum to check against
    Unchecked,
}

impl Verification {
    pub fn is_acceptable(&self) -> bool {
        !matches!(self, Verification::Invalid(_))
    }
}

pub trait ArtifactFetcher {
    /// Bring the artifact of `pkg` into `dest_dir`, returning its path
    fn fetch(&self, pkg: &Package, dest_dir: &Path) -> Result<PathBuf>;

    /// Check an artifact on disk against the package metadata
    fn verify(&self, path: &Path, pkg: &Package) -> Result<Verification>;
}

/// Fetcher for local paths, `file://` and `http(s)://` locations
pub struct DefaultFetcher {
    client: RepositoryClient,
}

impl DefaultFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: RepositoryClient::new()?,
        })
    }

    fn copy_local(source: &Path, dest: &Path) -> Result<()> {
        if !source.is_file() {
            return Err(Error::NotFoundError(format!(
                "Artifact {} does not exist",
                source.display()
            )));
        }
        if let (Ok(a), Ok(b)) = (source.canonicalize(), dest.canonicalize())
            && a == b
        {
            return Ok(());
        }
        fs::copy(source, dest).map_err(|e| {
            Error::DownloadError(format!(
                "Failed to copy {} to {}: {}",
                source.display(),
                dest.display(),
                e
            ))
        })?;
        Ok(())
    }
}

impl ArtifactFetcher for DefaultFetcher {
    fn fetch(&self, pkg: &Package, dest_dir: &Path) -> Result<PathBuf> {
        let location = pkg.location.as_deref().ok_or_else(|| {
            Error::NotFoundError(format!("{} has no artifact location", pkg))
        })?;

        fs::create_dir_all(dest_dir).map_err(|e| {
            Error::IoError(format!("Failed to create {}: {}", dest_dir.display(), e))
        })?;
        let dest = dest_dir.join(pkg.artifact_name());

        // a previous fetch may have left a good copy behind
        if dest.is_file() && self.verify(&dest, pkg)? == Verification::Valid {
            info!("Reusing {} from {}", pkg, dest_dir.display());
            return Ok(dest);
        }

        match Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                self.client.download_file(url.as_str(), &dest)?;
            }
            Ok(url) if url.scheme() == "file" => {
                let source = url.to_file_path().map_err(|_| {
                    Error::DownloadError(format!("Invalid file URL '{}'", location))
                })?;
                Self::copy_local(&source, &dest)?;
            }
            _ => Self::copy_local(Path::new(location), &dest)?,
        }

        debug!("Fetched {} to {}", pkg, dest.display());
        Ok(dest)
    }

    fn verify(&self, path: &Path, pkg: &Package) -> Result<Verification> {
        let Some(ref expected) = pkg.checksum else {
            return Ok(Verification::Unchecked);
        };

        if hash::verify_file(path, expected)? {
            Ok(Verification::Valid)
        } else {
            warn!("Checksum mismatch for {} at {}", pkg, path.display());
            Ok(Verification::Invalid(format!(
                "{} does not match checksum {}",
                path.display(),
                expected
            )))
        }
    }
}
