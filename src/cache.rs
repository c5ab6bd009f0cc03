// src/cache.rs

//! Lookup of previously fetched artifacts
//!
//! Cache directories are searched recursively, in configured order, for a
//! file named like the package artifact. They are treated as read-only:
//! the installer never deletes anything found there.

use crate::package::Package;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, Default)]
pub struct ArtifactCache {
    dirs: Vec<PathBuf>,
}

impl ArtifactCache {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// First cached artifact for `pkg`
    pub fn locate(&self, pkg: &Package) -> Option<PathBuf> {
        let wanted = pkg.artifact_name();

        for dir in &self.dirs {
            if !dir.is_dir() {
                continue;
            }
            let found = WalkDir::new(dir)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .find(|e| e.file_type().is_file() && e.file_name().to_string_lossy() == wanted);

            if let Some(entry) = found {
                debug!("Found {} in cache {}", wanted, dir.display());
                return Some(entry.into_path());
            }
        }
        None
    }

    /// Whether `path` lives inside one of the cache directories
    pub fn contains(&self, path: &Path) -> bool {
        let Ok(path) = path.canonicalize() else {
            return false;
        };
        self.dirs.iter().any(|dir| {
            dir.canonicalize()
                .map(|d| path.starts_with(d))
                .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_locate_searches_recursively_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let nested = second.path().join("x86_64/rpms");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("gaudi-28.1-1.tar.gz"), b"second").unwrap();

        let cache = ArtifactCache::new(vec![
            first.path().to_path_buf(),
            PathBuf::from("/nonexistent/sitepkg-cache"),
            second.path().to_path_buf(),
        ]);
        let pkg = Package::new("gaudi", "28.1", "1");
        assert_eq!(cache.locate(&pkg), Some(nested.join("gaudi-28.1-1.tar.gz")));

        fs::write(first.path().join("gaudi-28.1-1.tar.gz"), b"first").unwrap();
        assert_eq!(cache.locate(&pkg), Some(first.path().join("gaudi-28.1-1.tar.gz")));
        assert_eq!(cache.locate(&Package::new("root", "6", "1")), None);
    }

    #[test]
    fn test_contains() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let inside = dir.path().join("a.tar.gz");
        let outside = other.path().join("a.tar.gz");
        fs::write(&inside, b"x").unwrap();
        fs::write(&outside, b"x").unwrap();

        let cache = ArtifactCache::new(vec![dir.path().to_path_buf()]);
        assert!(cache.contains(&inside));
        assert!(!cache.contains(&outside));
        assert!(!cache.contains(&dir.path().join("missing")));
    }
}
