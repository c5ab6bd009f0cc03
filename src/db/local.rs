// src/db/local.rs

//! A single package database file

use super::models::{
    FileEntry, PackageEntry, PostInstallStatus, ProvideEntry, RequirementEntry,
};
use crate::error::{Error, Result};
use crate::package::{Package, PackageFilter, PackageSpec, Requirement};
use rusqlite::Connection;
use std::path::Path;
use tracing::debug;

/// One SQLite package database, writable or read-only
pub struct LocalDb {
    conn: Connection,
    location: String,
    read_only: bool,
}

impl LocalDb {
    /// Open (creating if needed) a writable database
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            super::init(path)?;
        }
        Ok(Self {
            conn: super::open(path)?,
            location: path.display().to_string(),
            read_only: false,
        })
    }

    pub fn open_read_only(path: &Path) -> Result<Self> {
        Ok(Self {
            conn: super::open_read_only(path)?,
            location: path.display().to_string(),
            read_only: true,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: super::open_in_memory()?,
            location: ":memory:".to_string(),
            read_only: false,
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(Error::DatabaseError(format!(
                "Database {} is read-only",
                self.location
            )));
        }
        Ok(())
    }

    /// Record a package with its edges and files, atomically
    pub fn add_package(&self, pkg: &Package, files: &[FileEntry]) -> Result<i64> {
        self.ensure_writable()?;
        debug!("Registering {} in {}", pkg, self.location);

        super::transaction(&self.conn, |tx| {
            let mut entry = PackageEntry::from_package(pkg);
            let id = entry.insert(tx)?;

            for req in &pkg.requires {
                RequirementEntry::from_requirement(id, req).insert(tx)?;
            }
            for provide in &pkg.provides {
                ProvideEntry::from_provide(id, provide).insert(tx)?;
            }
            for file in files {
                file.clone().insert(tx, id)?;
            }
            Ok(id)
        })
    }

    /// Drop a package record; returns whether one existed
    pub fn remove_package(&self, pkg: &Package) -> Result<bool> {
        self.ensure_writable()?;
        match self.entry(pkg)? {
            Some(PackageEntry { id: Some(id), .. }) => {
                PackageEntry::delete(&self.conn, id)?;
                debug!("Removed {} from {}", pkg, self.location);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn entry(&self, pkg: &Package) -> Result<Option<PackageEntry>> {
        PackageEntry::find_by_nvr(&self.conn, &pkg.name, &pkg.version, &pkg.release)
    }

    pub fn is_installed(&self, pkg: &Package) -> Result<bool> {
        Ok(self.entry(pkg)?.is_some())
    }

    /// Installed packages satisfying `req`, highest EVR first
    pub fn providers(&self, req: &Requirement) -> Result<Vec<Package>> {
        let mut found = Vec::new();
        for id in ProvideEntry::find_candidate_packages(&self.conn, &req.name)? {
            if let Some(entry) = PackageEntry::find_by_id(&self.conn, id)? {
                let pkg = entry.load_package(&self.conn)?;
                if pkg.fulfills(req) {
                    found.push(pkg);
                }
            }
        }
        found.sort_by(|a, b| b.compare_version(a));
        Ok(found)
    }

    pub fn provides(&self, req: &Requirement) -> Result<bool> {
        Ok(!self.providers(req)?.is_empty())
    }

    pub fn find_packages(&self, spec: &PackageSpec) -> Result<Vec<Package>> {
        PackageEntry::find_by_name(&self.conn, &spec.name)?
            .into_iter()
            .map(|e| e.load_package(&self.conn))
            .filter(|p| p.as_ref().map_or(true, |p| spec.matches(p)))
            .collect()
    }

    pub fn list_packages(&self, filter: &PackageFilter) -> Result<Vec<Package>> {
        PackageEntry::list_all(&self.conn)?
            .into_iter()
            .map(|e| e.load_package(&self.conn))
            .filter(|p| p.as_ref().map_or(true, |p| filter.matches(p)))
            .collect()
    }

    pub fn file_entries(&self, pkg: &Package) -> Result<Vec<FileEntry>> {
        match self.entry(pkg)? {
            Some(PackageEntry { id: Some(id), .. }) => FileEntry::find_by_package(&self.conn, id),
            _ => Err(Error::NotFoundError(format!(
                "{} is not registered in {}",
                pkg, self.location
            ))),
        }
    }

    pub fn set_post_install_status(&self, pkg: &Package, status: PostInstallStatus) -> Result<()> {
        self.ensure_writable()?;
        match self.entry(pkg)? {
            Some(PackageEntry { id: Some(id), .. }) => {
                PackageEntry::set_post_install_status(&self.conn, id, status)
            }
            _ => Err(Error::NotFoundError(format!(
                "{} is not registered in {}",
                pkg, self.location
            ))),
        }
    }

    pub fn post_install_status(&self, pkg: &Package) -> Result<Option<PostInstallStatus>> {
        Ok(self.entry(pkg)?.map(|e| e.post_install_status))
    }

    /// Installed packages other than `pkg` with a requirement `pkg` satisfies
    pub fn packages_requiring(&self, pkg: &Package) -> Result<Vec<Package>> {
        let mut dependents = Vec::new();
        for entry in PackageEntry::list_all(&self.conn)? {
            let candidate = entry.load_package(&self.conn)?;
            if candidate == *pkg {
                continue;
            }
            if candidate.requires.iter().any(|r| pkg.fulfills(r)) {
                dependents.push(candidate);
            }
        }
        Ok(dependents)
    }

    /// Whether another package than `pkg` also owns `path`
    pub fn is_shared_path(&self, pkg: &Package, path: &str) -> Result<bool> {
        let own_id = self.entry(pkg)?.and_then(|e| e.id);
        Ok(FileEntry::find_owners(&self.conn, path)?
            .into_iter()
            .any(|id| Some(id) != own_id))
    }
}
