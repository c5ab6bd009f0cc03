// src/db/chain.rs

//! Layered view over a writable database and read-only shared ones
//!
//! Reads go through the writable layer first, then each read-only layer in
//! the order it was added; the first layer with an answer wins. Writes only
//! ever reach the writable layer, so a package that lives in a shared layer
//! counts as installed but cannot be modified or removed from here.

use super::local::LocalDb;
use super::models::{FileEntry, PostInstallStatus};
use crate::error::Result;
use crate::package::{Package, PackageFilter, PackageSpec, Requirement};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Where an installed package was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layer {
    Local,
    Shared(String),
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Local => f.write_str("local"),
            Layer::Shared(location) => f.write_str(location),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstalledPackage {
    pub package: Package,
    pub layer: Layer,
}

pub struct ChainedDb {
    local: LocalDb,
    shared: Vec<LocalDb>,
}

impl ChainedDb {
    pub fn new(local: LocalDb) -> Self {
        Self {
            local,
            shared: Vec::new(),
        }
    }

    /// Open the writable database of an install area
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(LocalDb::open(path)?))
    }

    /// Append a read-only layer, consulted after all existing ones
    pub fn add_read_only_layer(&mut self, path: &Path) -> Result<()> {
        info!("Chaining read-only package database {}", path.display());
        self.shared.push(LocalDb::open_read_only(path)?);
        Ok(())
    }

    pub fn local(&self) -> &LocalDb {
        &self.local
    }

    fn layers(&self) -> impl Iterator<Item = (Layer, &LocalDb)> {
        std::iter::once((Layer::Local, &self.local)).chain(
            self.shared
                .iter()
                .map(|db| (Layer::Shared(db.location().to_string()), db)),
        )
    }

    /// Installed in any layer
    pub fn is_installed(&self, pkg: &Package) -> Result<bool> {
        Ok(self.layer_of(pkg)?.is_some())
    }

    pub fn is_installed_locally(&self, pkg: &Package) -> Result<bool> {
        self.local.is_installed(pkg)
    }

    /// First layer holding exactly this package
    pub fn layer_of(&self, pkg: &Package) -> Result<Option<Layer>> {
        for (layer, db) in self.layers() {
            if db.is_installed(pkg)? {
                return Ok(Some(layer));
            }
        }
        Ok(None)
    }

    /// Whether any layer has a package satisfying `req`
    pub fn provides(&self, req: &Requirement) -> Result<bool> {
        for (layer, db) in self.layers() {
            if db.provides(req)? {
                debug!("{} is provided by the {} layer", req, layer);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Best provider of `req` from the first layer that has one
    pub fn find_provider(&self, req: &Requirement, local_only: bool) -> Result<Option<Package>> {
        if local_only {
            return Ok(self.local.providers(req)?.into_iter().next());
        }
        for (_, db) in self.layers() {
            if let Some(pkg) = db.providers(req)?.into_iter().next() {
                return Ok(Some(pkg));
            }
        }
        Ok(None)
    }

    /// Packages matching `spec`, from the first layer with any match
    pub fn find_packages(&self, spec: &PackageSpec, local_only: bool) -> Result<Vec<Package>> {
        if local_only {
            return self.local.find_packages(spec);
        }
        for (_, db) in self.layers() {
            let found = db.find_packages(spec)?;
            if !found.is_empty() {
                return Ok(found);
            }
        }
        Ok(Vec::new())
    }

    /// Every installed package in every layer, tagged with its layer
    pub fn list_packages(&self, filter: &PackageFilter) -> Result<Vec<InstalledPackage>> {
        let mut all = Vec::new();
        for (layer, db) in self.layers() {
            for package in db.list_packages(filter)? {
                all.push(InstalledPackage {
                    package,
                    layer: layer.clone(),
                });
            }
        }
        Ok(all)
    }

    pub fn add_package(&self, pkg: &Package, files: &[FileEntry]) -> Result<i64> {
        self.local.add_package(pkg, files)
    }

    pub fn remove_package(&self, pkg: &Package) -> Result<bool> {
        self.local.remove_package(pkg)
    }

    pub fn file_entries(&self, pkg: &Package) -> Result<Vec<FileEntry>> {
        self.local.file_entries(pkg)
    }

    pub fn set_post_install_status(&self, pkg: &Package, status: PostInstallStatus) -> Result<()> {
        self.local.set_post_install_status(pkg, status)
    }

    pub fn post_install_status(&self, pkg: &Package) -> Result<Option<PostInstallStatus>> {
        self.local.post_install_status(pkg)
    }

    /// Locally installed dependents of `pkg`
    pub fn packages_requiring(&self, pkg: &Package) -> Result<Vec<Package>> {
        self.local.packages_requiring(pkg)
    }

    pub fn is_shared_path(&self, pkg: &Package, path: &str) -> Result<bool> {
        self.local.is_shared_path(pkg, path)
    }
}
