// src/db/models/file_entry.rs

//! FileEntry model - a path owned by an installed package
//!
//! Paths are stored relative to the install area root in `/a/b` form, after
//! relocation, so a database stays valid if the area is moved.

use crate::error::{Error, Result};
use rusqlite::{Connection, Row, params};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    File,
    Dir,
    Symlink,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::File => "file",
            FileKind::Dir => "dir",
            FileKind::Symlink => "symlink",
        }
    }
}

impl FromStr for FileKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "file" => Ok(FileKind::File),
            "dir" => Ok(FileKind::Dir),
            "symlink" => Ok(FileKind::Symlink),
            other => Err(Error::DatabaseError(format!("Invalid file kind '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub id: Option<i64>,
    pub package_id: Option<i64>,
    pub path: String,
    pub size: u64,
    /// SHA-256 of regular file contents
    pub checksum: Option<String>,
    pub kind: FileKind,
    /// Whether the relocation map rewrote this path
    pub relocated: bool,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, kind: FileKind) -> Self {
        Self {
            id: None,
            package_id: None,
            path: path.into(),
            size: 0,
            checksum: None,
            kind,
            relocated: false,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Dir
    }

    pub fn insert(&mut self, conn: &Connection, package_id: i64) -> Result<i64> {
        conn.execute(
            "INSERT INTO files (package_id, path, size, checksum, kind, relocated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                package_id,
                &self.path,
                self.size as i64,
                &self.checksum,
                self.kind.as_str(),
                self.relocated,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        self.package_id = Some(package_id);
        Ok(id)
    }

    /// Files of a package in the order they were registered
    pub fn find_by_package(conn: &Connection, package_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, package_id, path, size, checksum, kind, relocated
             FROM files WHERE package_id = ?1 ORDER BY id",
        )?;
        let files = stmt
            .query_map([package_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(files)
    }

    /// Packages owning a given path
    pub fn find_owners(conn: &Connection, path: &str) -> Result<Vec<i64>> {
        let mut stmt = conn.prepare("SELECT DISTINCT package_id FROM files WHERE path = ?1")?;
        let ids = stmt
            .query_map([path], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let size: i64 = row.get(3)?;
        let kind: String = row.get(5)?;
        Ok(Self {
            id: Some(row.get(0)?),
            package_id: Some(row.get(1)?),
            path: row.get(2)?,
            size: size.max(0) as u64,
            checksum: row.get(4)?,
            kind: kind.parse().unwrap_or(FileKind::File),
            relocated: row.get(6)?,
        })
    }
}
