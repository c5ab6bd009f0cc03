// src/db/paths.rs
//! Path derivation for install area directories

use std::path::{Path, PathBuf};

/// Database location relative to the install area root
pub const DB_RELATIVE_PATH: &str = "var/lib/sitepkg/packages.db";

/// Default database path for an install area
pub fn default_db_path(siteroot: &Path) -> PathBuf {
    siteroot.join(DB_RELATIVE_PATH)
}

/// Directory containing the database
pub fn db_dir(db_path: &Path) -> PathBuf {
    db_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Scratch directory for fetched artifacts
pub fn default_tmp_dir(siteroot: &Path) -> PathBuf {
    siteroot.join("tmp")
}

/// Lock file guarding the install area
pub fn lock_path(db_path: &Path) -> PathBuf {
    db_dir(db_path).join("sitepkg.lock")
}
