// src/archive/tar.rs

//! `.tar.gz` artifacts

use super::{
    ArtifactManifest, ExtractTarget, ExtractionJournal, Extractor, ManifestEntry, METADATA_DIR,
    POST_INSTALL_SCRIPT, PREFIX_FILE,
};
use crate::db::models::{FileEntry, FileKind};
use crate::error::{Error, Result};
use crate::filesystem::{normalize_entry_path, safe_join};
use crate::hash;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;
use tar::{Archive, EntryType};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct TarGzExtractor;

impl TarGzExtractor {
    pub fn new() -> Self {
        Self
    }

    fn open(artifact: &Path) -> Result<Archive<GzDecoder<BufReader<File>>>> {
        let file = File::open(artifact).map_err(|e| {
            Error::ExtractionError(format!("Cannot open {}: {}", artifact.display(), e))
        })?;
        Ok(Archive::new(GzDecoder::new(BufReader::new(file))))
    }
}

fn metadata_name(path: &str) -> Option<&str> {
    path.strip_prefix('/')
        .and_then(|p| p.strip_prefix(METADATA_DIR))
        .and_then(|p| if p.is_empty() { Some("") } else { p.strip_prefix('/') })
}

fn entry_kind(entry_type: EntryType) -> Option<FileKind> {
    match entry_type {
        EntryType::Regular | EntryType::Continuous => Some(FileKind::File),
        EntryType::Directory => Some(FileKind::Dir),
        EntryType::Symlink => Some(FileKind::Symlink),
        _ => None,
    }
}

fn read_error(artifact: &Path, e: impl std::fmt::Display) -> Error {
    Error::ExtractionError(format!("Corrupt artifact {}: {}", artifact.display(), e))
}

impl Extractor for TarGzExtractor {
    fn inspect(&self, artifact: &Path) -> Result<ArtifactManifest> {
        let mut archive = Self::open(artifact)?;
        let mut manifest = ArtifactManifest::default();

        for entry in archive.entries().map_err(|e| read_error(artifact, e))? {
            let mut entry = entry.map_err(|e| read_error(artifact, e))?;
            let raw = entry.path().map_err(|e| read_error(artifact, e))?.into_owned();
            let path = match normalize_entry_path(&raw) {
                Ok(p) => p,
                Err(Error::PathTraversal(p)) => {
                    return Err(Error::ExtractionError(format!(
                        "{} contains unsafe path {}",
                        artifact.display(),
                        p
                    )));
                }
                Err(_) => continue,
            };

            if let Some(name) = metadata_name(&path) {
                let mut content = String::new();
                match name {
                    POST_INSTALL_SCRIPT => {
                        entry
                            .read_to_string(&mut content)
                            .map_err(|e| read_error(artifact, e))?;
                        manifest.post_install = Some(content);
                    }
                    PREFIX_FILE => {
                        entry
                            .read_to_string(&mut content)
                            .map_err(|e| read_error(artifact, e))?;
                        manifest.prefix = Some(normalize_entry_path(content.trim())?);
                    }
                    _ => {}
                }
                continue;
            }

            let Some(kind) = entry_kind(entry.header().entry_type()) else {
                warn!(
                    "Ignoring unsupported entry {} in {}",
                    path,
                    artifact.display()
                );
                continue;
            };

            let (size, checksum) = match kind {
                FileKind::File => {
                    let size = entry.header().size().map_err(|e| read_error(artifact, e))?;
                    let checksum =
                        hash::sha256_reader(&mut entry).map_err(|e| read_error(artifact, e))?;
                    (size, Some(checksum))
                }
                _ => (0, None),
            };

            manifest.entries.push(ManifestEntry {
                path,
                kind,
                size,
                checksum,
            });
        }

        debug!(
            "{} holds {} entries",
            artifact.display(),
            manifest.entries.len()
        );
        Ok(manifest)
    }

    fn extract(
        &self,
        artifact: &Path,
        target: &ExtractTarget<'_>,
        journal: &mut ExtractionJournal,
    ) -> Result<Vec<FileEntry>> {
        let manifest = self.inspect(artifact)?;
        let files = manifest.install_entries(target.relocation);

        // parents first, so empty directories of the payload exist too
        for dir in files.iter().filter(|f| f.is_dir()) {
            journal.create_dir_all(&safe_join(target.root, &dir.path)?)?;
        }

        let mut archive = Self::open(artifact)?;
        for entry in archive.entries().map_err(|e| read_error(artifact, e))? {
            let mut entry = entry.map_err(|e| read_error(artifact, e))?;
            let raw = entry.path().map_err(|e| read_error(artifact, e))?.into_owned();
            let Ok(path) = normalize_entry_path(&raw) else {
                continue;
            };
            if metadata_name(&path).is_some() {
                continue;
            }
            match entry_kind(entry.header().entry_type()) {
                Some(FileKind::File) | Some(FileKind::Symlink) => {}
                _ => continue,
            }

            let (relocated, _) = target.relocation.relocate(&path);
            let dest = safe_join(target.root, &relocated)?;

            if let Ok(meta) = fs::symlink_metadata(&dest) {
                if meta.is_dir() {
                    return Err(Error::ExtractionError(format!(
                        "{} is a directory, cannot replace it with a file",
                        dest.display()
                    )));
                }
                if !target.overwrite {
                    return Err(Error::ExtractionError(format!(
                        "{} already exists (use overwrite to replace it)",
                        dest.display()
                    )));
                }
                fs::remove_file(&dest).map_err(|e| {
                    Error::ExtractionError(format!("Cannot replace {}: {}", dest.display(), e))
                })?;
            }

            if let Some(parent) = dest.parent() {
                journal.create_dir_all(parent)?;
            }

            journal.record_file(dest.clone());
            entry.unpack(&dest).map_err(|e| {
                Error::ExtractionError(format!("Failed to write {}: {}", dest.display(), e))
            })?;
        }

        Ok(files)
    }
}
