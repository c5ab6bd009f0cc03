// src/db/mod.rs

//! Local package database
//!
//! Every install area keeps a SQLite database of the packages installed into
//! it and the files they own. [`LocalDb`] wraps one database file;
//! [`ChainedDb`] stacks a writable local database on top of read-only shared
//! ones and answers "is this already present" across all of them.

mod chain;
mod local;
pub mod models;
pub mod paths;
pub mod schema;

pub use chain::{ChainedDb, InstalledPackage, Layer};
pub use local::LocalDb;

use crate::error::{Error, Result};
use rusqlite::{Connection, OpenFlags};
use std::fs;
use std::path::Path;
use tracing::info;

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

/// Create the database (and its parent directory) and bring the schema up
/// to date
pub fn init(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| {
            Error::InitError(format!(
                "Failed to create database directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let conn = Connection::open(db_path)?;
    configure(&conn)?;
    schema::migrate(&conn)?;
    info!("Initialized package database at {}", db_path.display());
    Ok(())
}

/// Open an existing writable database, applying pending migrations
pub fn open(db_path: &Path) -> Result<Connection> {
    if !db_path.exists() {
        return Err(Error::NotFoundError(format!(
            "Database not found at {}",
            db_path.display()
        )));
    }

    let conn = Connection::open(db_path)?;
    configure(&conn)?;
    schema::migrate(&conn)?;
    Ok(conn)
}

/// Open a database strictly read-only; the schema is checked, never migrated
pub fn open_read_only(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| {
        Error::DatabaseError(format!(
            "Failed to open read-only database {}: {}",
            db_path.display(),
            e
        ))
    })?;

    let version = schema::read_schema_version(&conn)?;
    if version != schema::SCHEMA_VERSION {
        return Err(Error::DatabaseError(format!(
            "Database {} has schema version {}, expected {}",
            db_path.display(),
            version,
            schema::SCHEMA_VERSION
        )));
    }
    Ok(conn)
}

/// Fresh in-memory database, used by tests and dry runs
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    schema::migrate(&conn)?;
    Ok(conn)
}

/// Run `f` inside a transaction, committing on success
pub fn transaction<T, F>(conn: &Connection, f: F) -> Result<T>
where
    F: FnOnce(&rusqlite::Transaction) -> Result<T>,
{
    let tx = conn.unchecked_transaction()?;
    let result = f(&tx)?;
    tx.commit()?;
    Ok(result)
}
