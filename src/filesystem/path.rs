// src/filesystem/path.rs

//! Path handling for untrusted artifact entries
//!
//! Archive entries are normalised to an absolute-looking form (`/opt/x/bin`)
//! which is what the relocation map and the database work with. Only
//! [`safe_join`] turns such a path into a real location, always below the
//! install area root.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Normalise an archive entry path to `/a/b/c`
///
/// `.` components and leading `./` or `/` are dropped. A `..` component is
/// rejected outright, as is a path that normalises to nothing.
pub fn normalize_entry_path(entry: impl AsRef<Path>) -> Result<String> {
    let entry = entry.as_ref();
    let mut parts = Vec::new();

    for component in entry.components() {
        match component {
            Component::Normal(c) => parts.push(c.to_string_lossy().into_owned()),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                return Err(Error::PathTraversal(entry.display().to_string()));
            }
        }
    }

    if parts.is_empty() {
        return Err(Error::ParseError(format!(
            "Empty path after normalisation: '{}'",
            entry.display()
        )));
    }

    Ok(format!("/{}", parts.join("/")))
}

/// Join a normalised path under `root`
///
/// The path is re-normalised first so a caller cannot smuggle `..` in. The
/// deepest existing ancestor of the result must resolve below the canonical
/// root, so a symlinked directory cannot lead out of the install area. The
/// final component is not resolved: a payload symlink may point anywhere.
pub fn safe_join(root: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<PathBuf> {
    let root = root.as_ref();
    let normalized = normalize_entry_path(path)?;
    let joined = root.join(normalized.trim_start_matches('/'));

    if let Ok(canonical_root) = root.canonicalize()
        && let Some(parent) = joined.parent()
    {
        check_within(&canonical_root, parent, &joined)?;
    }

    Ok(joined)
}

fn check_within(canonical_root: &Path, dir: &Path, joined: &Path) -> Result<()> {
    let escapes = || {
        Error::PathTraversal(format!(
            "{} escapes install area {}",
            joined.display(),
            canonical_root.display()
        ))
    };

    let Some(existing) = dir
        .ancestors()
        .find(|d| fs::symlink_metadata(d).is_ok())
    else {
        return Ok(());
    };
    // a dangling link cannot be resolved, and may be created later
    let resolved = existing.canonicalize().map_err(|_| escapes())?;
    if !resolved.starts_with(canonical_root) {
        return Err(escapes());
    }
    Ok(())
}
