// src/archive/mod.rs

//! Artifact contents and their materialisation in the install area
//!
//! An [`Extractor`] reads an artifact's [`ArtifactManifest`] and writes its
//! files below the install area root, honouring the relocation map. Every
//! path it creates goes into an [`ExtractionJournal`] so a failed package
//! can be taken out again without touching anything that was there before.
//!
//! Artifacts carry their metadata under `.pkginfo/` (never extracted):
//! - `.pkginfo/post-install`: post-install hook script
//! - `.pkginfo/prefix`: install prefix, before relocation

mod tar;

pub use self::tar::TarGzExtractor;

use crate::db::models::{FileEntry, FileKind};
use crate::error::{Error, Result};
use crate::filesystem::{RelocationMap, safe_join};
use crate::hash;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Archive directory holding package metadata
pub const METADATA_DIR: &str = ".pkginfo";

/// Hook script inside [`METADATA_DIR`]
pub const POST_INSTALL_SCRIPT: &str = "post-install";

/// Declared install prefix inside [`METADATA_DIR`]
pub const PREFIX_FILE: &str = "prefix";

/// One payload entry of an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Normalised path, before relocation
    pub path: String,
    pub kind: FileKind,
    pub size: u64,
    pub checksum: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactManifest {
    pub entries: Vec<ManifestEntry>,
    pub post_install: Option<String>,
    pub prefix: Option<String>,
}

impl ArtifactManifest {
    /// File list as it will be registered: relocated, with any missing
    /// parent directories added ahead of their first child
    pub fn install_entries(&self, relocation: &RelocationMap) -> Vec<FileEntry> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            let (path, relocated) = relocation.relocate(&entry.path);

            for parent in ancestors(&path) {
                if seen.insert(parent.clone()) {
                    let mut dir = FileEntry::new(parent, FileKind::Dir);
                    dir.relocated = relocated;
                    out.push(dir);
                }
            }

            if path == "/" || !seen.insert(path.clone()) {
                continue;
            }
            let mut file = FileEntry::new(path, entry.kind);
            file.size = entry.size;
            file.checksum = entry.checksum.clone();
            file.relocated = relocated;
            out.push(file);
        }

        out
    }

    /// Relocated top directory of the payload
    ///
    /// The declared prefix wins; otherwise the deepest directory containing
    /// every entry.
    pub fn install_prefix(&self, relocation: &RelocationMap) -> Option<String> {
        let prefix = match self.prefix {
            Some(ref p) => Some(p.clone()),
            None => common_dir(self.entries.iter().map(|e| match e.kind {
                FileKind::Dir => e.path.clone(),
                _ => parent_of(&e.path),
            })),
        }?;
        Some(relocation.relocate(&prefix).0)
    }
}

/// Strict ancestors of a `/a/b/c` path, outermost first, excluding `/`
fn ancestors(path: &str) -> Vec<String> {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    (1..parts.len())
        .map(|n| format!("/{}", parts[..n].join("/")))
        .collect()
}

fn parent_of(path: &str) -> String {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/".to_string(),
        Some((parent, _)) => parent.to_string(),
    }
}

fn common_dir<I: Iterator<Item = String>>(paths: I) -> Option<String> {
    let mut common: Option<Vec<String>> = None;
    for path in paths {
        let parts: Vec<String> = path
            .split('/')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        common = Some(match common {
            None => parts,
            Some(current) => current
                .into_iter()
                .zip(parts)
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| a)
                .collect(),
        });
    }
    common.map(|parts| format!("/{}", parts.join("/")))
}

/// Where and how to extract
#[derive(Debug, Clone, Copy)]
pub struct ExtractTarget<'a> {
    pub root: &'a Path,
    pub relocation: &'a RelocationMap,
    pub overwrite: bool,
}

/// Paths created during one package's extraction
#[derive(Debug, Default)]
pub struct ExtractionJournal {
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
}

impl ExtractionJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_file(&mut self, path: PathBuf) {
        self.files.push(path);
    }

    pub fn record_dir(&mut self, path: PathBuf) {
        self.dirs.push(path);
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }

    /// Create `dir` and any missing ancestors, recording each one created
    pub fn create_dir_all(&mut self, dir: &Path) -> Result<()> {
        let mut missing = Vec::new();
        let mut current = Some(dir);
        while let Some(d) = current {
            if d.as_os_str().is_empty() || d.exists() {
                break;
            }
            missing.push(d.to_path_buf());
            current = d.parent();
        }

        for d in missing.into_iter().rev() {
            match fs::create_dir(&d) {
                Ok(()) => self.record_dir(d),
                Err(e) if e.kind() == ErrorKind::AlreadyExists && d.is_dir() => {}
                Err(e) => {
                    return Err(Error::ExtractionError(format!(
                        "Failed to create directory {}: {}",
                        d.display(),
                        e
                    )));
                }
            }
        }
        Ok(())
    }

    /// Undo everything recorded: files first, then directories innermost
    /// first, leaving non-empty directories alone
    pub fn rollback(&mut self) {
        for file in self.files.drain(..) {
            match fs::remove_file(&file) {
                Ok(()) => debug!("Rolled back {}", file.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to roll back {}: {}", file.display(), e),
            }
        }
        for dir in self.dirs.drain(..).rev() {
            let _ = fs::remove_dir(&dir);
        }
    }
}

/// Reads artifacts and writes their payload into the install area
pub trait Extractor {
    fn inspect(&self, artifact: &Path) -> Result<ArtifactManifest>;

    /// Write the payload; returns the registered file list
    fn extract(
        &self,
        artifact: &Path,
        target: &ExtractTarget<'_>,
        journal: &mut ExtractionJournal,
    ) -> Result<Vec<FileEntry>>;
}

/// Compare what is on disk with the registered file list
pub fn check_extracted(root: &Path, files: &[FileEntry]) -> Result<()> {
    for file in files {
        let path = safe_join(root, &file.path)?;
        let meta = fs::symlink_metadata(&path).map_err(|e| {
            Error::ExtractionError(format!("{} missing after extraction: {}", path.display(), e))
        })?;

        match file.kind {
            FileKind::Dir if !meta.is_dir() => {
                return Err(Error::ExtractionError(format!(
                    "{} should be a directory",
                    path.display()
                )));
            }
            FileKind::Symlink if !meta.file_type().is_symlink() => {
                return Err(Error::ExtractionError(format!(
                    "{} should be a symlink",
                    path.display()
                )));
            }
            FileKind::File => {
                if !meta.is_file() || meta.len() != file.size {
                    return Err(Error::ExtractionError(format!(
                        "{} has size {} on disk, artifact says {}",
                        path.display(),
                        meta.len(),
                        file.size
                    )));
                }
                if let Some(ref expected) = file.checksum
                    && !hash::verify_file(&path, expected)?
                {
                    return Err(Error::ExtractionError(format!(
                        "{} does not match its artifact checksum",
                        path.display()
                    )));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Delete a package's files: plain files and links first, then directories
/// in reverse list order, skipping those still holding something
///
/// Missing paths are ignored. Returns how many paths were removed.
pub fn remove_files(root: &Path, files: &[FileEntry]) -> Result<usize> {
    let mut removed = 0;

    for file in files.iter().filter(|f| !f.is_dir()) {
        let path = safe_join(root, &file.path)?;
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Cannot remove {}: {}", path.display(), e),
        }
    }

    for dir in files.iter().rev().filter(|f| f.is_dir()) {
        let path = safe_join(root, &dir.path)?;
        match fs::remove_dir(&path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(_) => debug!("Keeping non-empty directory {}", path.display()),
        }
    }

    Ok(removed)
}
