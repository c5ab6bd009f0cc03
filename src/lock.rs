// src/lock.rs

//! Exclusive lock on an install area
//!
//! The engine assumes it is the only writer of an install area and its
//! database. The CLI takes this lock around `install`, `remove` and `update`;
//! library callers that drive the installer concurrently must do the same.
//!
//! The lock file lives next to the package database
//! (`<db dir>/sitepkg.lock`) and is held with `flock(LOCK_EX)` until dropped.

use crate::db::paths::lock_path;
use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const MAX_ATTEMPTS: u32 = 5;
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

pub struct AreaLock {
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
}

impl AreaLock {
    /// Lock the install area owning the database at `db_path`
    pub fn for_database(db_path: &Path) -> Result<Self> {
        Self::acquire(lock_path(db_path))
    }

    /// Acquire the lock, retrying with exponential backoff while another
    /// process holds it
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut backoff = INITIAL_BACKOFF;

        for attempt in 1..=MAX_ATTEMPTS {
            if let Some(lock) = Self::try_acquire(path)? {
                return Ok(lock);
            }
            if attempt < MAX_ATTEMPTS {
                warn!(
                    "Install area is locked ({}), retrying in {:?}",
                    path.display(),
                    backoff
                );
                thread::sleep(backoff);
                backoff *= 2;
            }
        }

        Err(Error::IoError(format!(
            "Install area is locked by another process: {}",
            path.display()
        )))
    }

    /// Try once; `Ok(None)` if another process holds the lock
    pub fn try_acquire<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!("Acquired install area lock at {}", path.display());
                Ok(Some(Self { file, path }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(Error::IoError(format!(
                "Failed to lock {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for AreaLock {
    fn drop(&mut self) {
        info!("Released install area lock at {}", self.path.display());
    }
}
