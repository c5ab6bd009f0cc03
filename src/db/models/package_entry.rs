// src/db/models/package_entry.rs

//! PackageEntry model - one installed package

use super::{FileEntry, ProvideEntry, RequirementEntry};
use crate::error::{Error, Result};
use crate::package::Package;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::fmt;
use std::str::FromStr;

const COLUMNS: &str = "id, name, version, release, epoch, arch, location, checksum, \
                       post_install_status, installed_at";

/// Outcome of the post-install hook, stored as `N` / `Y` / `E`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostInstallStatus {
    #[default]
    NotRun,
    Success,
    Error,
}

impl PostInstallStatus {
    pub fn as_code(&self) -> &'static str {
        match self {
            PostInstallStatus::NotRun => "N",
            PostInstallStatus::Success => "Y",
            PostInstallStatus::Error => "E",
        }
    }
}

impl FromStr for PostInstallStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "N" => Ok(PostInstallStatus::NotRun),
            "Y" => Ok(PostInstallStatus::Success),
            "E" => Ok(PostInstallStatus::Error),
            other => Err(Error::DatabaseError(format!(
                "Invalid post-install status '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for PostInstallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PostInstallStatus::NotRun => "not run",
            PostInstallStatus::Success => "success",
            PostInstallStatus::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct PackageEntry {
    pub id: Option<i64>,
    pub name: String,
    pub version: String,
    pub release: String,
    pub epoch: i64,
    pub arch: Option<String>,
    pub location: Option<String>,
    pub checksum: Option<String>,
    pub post_install_status: PostInstallStatus,
    pub installed_at: Option<String>,
}

impl PackageEntry {
    pub fn from_package(pkg: &Package) -> Self {
        Self {
            id: None,
            name: pkg.name.clone(),
            version: pkg.version.clone(),
            release: pkg.release.clone(),
            epoch: pkg.epoch as i64,
            arch: pkg.arch.clone(),
            location: pkg.location.clone(),
            checksum: pkg.checksum.clone(),
            post_install_status: PostInstallStatus::NotRun,
            installed_at: None,
        }
    }

    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO packages (name, version, release, epoch, arch, location, checksum, post_install_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                &self.name,
                &self.version,
                &self.release,
                &self.epoch,
                &self.arch,
                &self.location,
                &self.checksum,
                self.post_install_status.as_code(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Self>> {
        let sql = format!("SELECT {} FROM packages WHERE id = ?1", COLUMNS);
        let entry = conn.query_row(&sql, [id], Self::from_row).optional()?;
        Ok(entry)
    }

    pub fn find_by_nvr(
        conn: &Connection,
        name: &str,
        version: &str,
        release: &str,
    ) -> Result<Option<Self>> {
        let sql = format!(
            "SELECT {} FROM packages WHERE name = ?1 AND version = ?2 AND release = ?3",
            COLUMNS
        );
        let entry = conn
            .query_row(&sql, params![name, version, release], Self::from_row)
            .optional()?;
        Ok(entry)
    }

    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Vec<Self>> {
        let sql = format!("SELECT {} FROM packages WHERE name = ?1 ORDER BY id", COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map([name], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let sql = format!("SELECT {} FROM packages ORDER BY name, id", COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Delete the record; requires, provides and files cascade
    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        conn.execute("DELETE FROM packages WHERE id = ?1", [id])?;
        Ok(())
    }

    pub fn set_post_install_status(
        conn: &Connection,
        id: i64,
        status: PostInstallStatus,
    ) -> Result<()> {
        conn.execute(
            "UPDATE packages SET post_install_status = ?1 WHERE id = ?2",
            params![status.as_code(), id],
        )?;
        Ok(())
    }

    /// Rebuild the full package, including requires, provides and file list
    pub fn load_package(&self, conn: &Connection) -> Result<Package> {
        let id = self
            .id
            .ok_or_else(|| Error::DatabaseError(format!("{} has no id", self.name)))?;

        let mut pkg = Package::new(&self.name, &self.version, &self.release);
        pkg.epoch = self.epoch.max(0) as u64;
        pkg.arch = self.arch.clone();
        pkg.location = self.location.clone();
        pkg.checksum = self.checksum.clone();
        pkg.requires = RequirementEntry::find_by_package(conn, id)?
            .into_iter()
            .map(RequirementEntry::into_requirement)
            .collect();
        pkg.provides = ProvideEntry::find_by_package(conn, id)?
            .into_iter()
            .map(ProvideEntry::into_provide)
            .collect();
        pkg.file_list = FileEntry::find_by_package(conn, id)?
            .into_iter()
            .map(|f| f.path)
            .collect();
        Ok(pkg)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let status: String = row.get(8)?;
        Ok(Self {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            version: row.get(2)?,
            release: row.get(3)?,
            epoch: row.get(4)?,
            arch: row.get(5)?,
            location: row.get(6)?,
            checksum: row.get(7)?,
            post_install_status: status.parse().unwrap_or_default(),
            installed_at: row.get(9)?,
        })
    }
}
