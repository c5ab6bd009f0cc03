// src/db/models/requirement_entry.rs

//! RequirementEntry model - what an installed package requires

use crate::error::Result;
use crate::package::Requirement;
use crate::version::Comparator;
use rusqlite::{Connection, Row, params};

#[derive(Debug, Clone)]
pub struct RequirementEntry {
    pub id: Option<i64>,
    pub package_id: i64,
    pub name: String,
    pub version: Option<String>,
    pub release: Option<String>,
    pub epoch: Option<i64>,
    pub comparator: String,
}

impl RequirementEntry {
    pub fn from_requirement(package_id: i64, req: &Requirement) -> Self {
        Self {
            id: None,
            package_id,
            name: req.name.clone(),
            version: req.version.clone(),
            release: req.release.clone(),
            epoch: req.epoch.map(|e| e as i64),
            comparator: req.comparator.as_str().to_string(),
        }
    }

    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO requires (package_id, name, version, release, epoch, comparator)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &self.package_id,
                &self.name,
                &self.version,
                &self.release,
                &self.epoch,
                &self.comparator,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Requirements of a package in declaration order
    pub fn find_by_package(conn: &Connection, package_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, package_id, name, version, release, epoch, comparator
             FROM requires WHERE package_id = ?1 ORDER BY id",
        )?;
        let entries = stmt
            .query_map([package_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn into_requirement(self) -> Requirement {
        Requirement {
            name: self.name,
            version: self.version,
            release: self.release,
            epoch: self.epoch.map(|e| e.max(0) as u64),
            comparator: self.comparator.parse().unwrap_or(Comparator::Any),
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
            comparator: row.get(6)?,
        })
    }
}
