// src/db/models/provide_entry.rs

//! ProvideEntry model - extra capabilities an installed package offers
//!
//! The package's own name is not stored here; lookups by capability name
//! check the packages table as well.

use crate::error::Result;
use crate::package::Provide;
use rusqlite::{Connection, Row, params};

#[derive(Debug, Clone)]
pub struct ProvideEntry {
    pub id: Option<i64>,
    pub package_id: i64,
    pub name: String,
    pub version: Option<String>,
    pub release: Option<String>,
    pub epoch: Option<i64>,
}

impl ProvideEntry {
    pub fn from_provide(package_id: i64, provide: &Provide) -> Self {
        Self {
            id: None,
            package_id,
            name: provide.name.clone(),
            version: provide.version.clone(),
            release: provide.release.clone(),
            epoch: provide.epoch.map(|e| e as i64),
        }
    }

    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO provides (package_id, name, version, release, epoch)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &self.package_id,
                &self.name,
                &self.version,
                &self.release,
                &self.epoch,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    pub fn find_by_package(conn: &Connection, package_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, package_id, name, version, release, epoch
             FROM provides WHERE package_id = ?1 ORDER BY id",
        )?;
        let entries = stmt
            .query_map([package_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Ids of packages that could satisfy a capability called `name`,
    /// either by package name or by an explicit provide
    pub fn find_candidate_packages(conn: &Connection, name: &str) -> Result<Vec<i64>> {
        let mut stmt = conn.prepare(
            "SELECT id FROM packages WHERE name = ?1
             UNION
             SELECT package_id FROM provides WHERE name = ?1
             ORDER BY 1",
        )?;
        let ids = stmt
            .query_map([name], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    pub fn into_provide(self) -> Provide {
        Provide {
            name: self.name,
            version: self.version,
            release: self.release,
            epoch: self.epoch.map(|e| e.max(0) as u64),
        }
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            package_id: row.get(1)?,
            name: row.get(2)?,
            version: row.get(3)?,
            release: row.get(4)?,
            epoch: row.get(5)?,
        })
    }
}
