// tests/common/mod.rs

//! Shared fixtures for the integration tests: a throwaway install area,
//! a repository of freshly built `.tar.gz` artifacts, and test doubles for
//! the extractor, fetcher and hook runner seams.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::GzEncoder;
use sitepkg::archive::{
    ArtifactManifest, ExtractTarget, ExtractionJournal, Extractor, TarGzExtractor,
};
use sitepkg::db::ChainedDb;
use sitepkg::db::models::FileEntry;
use sitepkg::filesystem::safe_join;
use sitepkg::hash;
use sitepkg::repository::{ArtifactFetcher, DefaultFetcher, IndexRepository, Verification};
use sitepkg::scriptlet::{HookEnv, HookRunner};
use sitepkg::{Error, Installer, Package, PackageSpec, Requirement, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Write a `.tar.gz` artifact holding `files` (relative paths) and an
/// optional post-install hook
pub fn build_artifact(path: &Path, files: &[(&str, &[u8])], post_install: Option<&str>) {
    let file = File::create(path).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    let mut append = |name: &str, data: &[u8], mode: u32| {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(mode);
        builder.append_data(&mut header, name, data).unwrap();
    };

    for (name, data) in files {
        append(name, data, 0o644);
    }
    if let Some(script) = post_install {
        append(".pkginfo/post-install", script.as_bytes(), 0o755);
    }

    builder.into_inner().unwrap().finish().unwrap();
}

/// Default payload of a package: two files below `/opt/sw/<name>`
pub fn default_payload(name: &str) -> Vec<(String, Vec<u8>)> {
    vec![
        (
            format!("opt/sw/{}/bin/{}", name, name),
            format!("#!/bin/sh\necho {}\n", name).into_bytes(),
        ),
        (
            format!("opt/sw/{}/share/README", name),
            format!("{} documentation\n", name).into_bytes(),
        ),
    ]
}

pub fn pkg(name: &str, version: &str, requires: &[&str]) -> Package {
    Package::new(name, version, "1")
        .with_requires(requires.iter().map(|r| Requirement::new(*r)).collect())
}

pub fn spec(s: &str) -> PackageSpec {
    PackageSpec::parse(s).unwrap()
}

/// Throwaway install area with its own repository directory
pub struct Area {
    pub dir: TempDir,
    pub root: PathBuf,
    pub repo_dir: PathBuf,
    pub db_path: PathBuf,
    pub tmp_dir: PathBuf,
    packages: Vec<Package>,
}

impl Area {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("area");
        let repo_dir = dir.path().join("repo");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&repo_dir).unwrap();

        Self {
            db_path: sitepkg::db::paths::default_db_path(&root),
            tmp_dir: dir.path().join("scratch"),
            root,
            repo_dir,
            dir,
            packages: Vec::new(),
        }
    }

    /// Build the default artifact of `pkg` and add it to the repository
    pub fn publish(&mut self, pkg: Package) -> Package {
        let payload = default_payload(&pkg.name);
        self.publish_with(pkg, &payload, None)
    }

    pub fn publish_with_hook(&mut self, pkg: Package, script: &str) -> Package {
        let payload = default_payload(&pkg.name);
        self.publish_with(pkg, &payload, Some(script))
    }

    pub fn publish_with(
        &mut self,
        pkg: Package,
        payload: &[(String, Vec<u8>)],
        post_install: Option<&str>,
    ) -> Package {
        let files: Vec<(&str, &[u8])> = payload
            .iter()
            .map(|(name, data)| (name.as_str(), data.as_slice()))
            .collect();
        self.publish_built(pkg, |artifact| {
            build_artifact(artifact, &files, post_install)
        })
    }

    /// Add `pkg` with an artifact written by `build`
    pub fn publish_built(&mut self, mut pkg: Package, build: impl FnOnce(&Path)) -> Package {
        let artifact = self.repo_dir.join(pkg.artifact_name());
        build(&artifact);

        pkg.location = Some(artifact.display().to_string());
        pkg.checksum = Some(hash::sha256_file(&artifact).unwrap());
        self.packages.push(pkg.clone());
        pkg
    }

    /// Publish `pkg` without a checksum in the index
    pub fn publish_unchecked(&mut self, pkg: Package) -> Package {
        let mut pkg = self.publish(pkg);
        pkg.checksum = None;
        if let Some(last) = self.packages.last_mut() {
            last.checksum = None;
        }
        pkg
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn artifact_of(&self, pkg: &Package) -> PathBuf {
        PathBuf::from(pkg.location.as_deref().unwrap())
    }

    pub fn open_db(&self) -> ChainedDb {
        ChainedDb::open(&self.db_path).unwrap()
    }

    /// Installer over this area's database and repository
    pub fn installer(&self) -> Installer {
        self.installer_with_db(self.open_db())
    }

    pub fn installer_with_db(&self, db: ChainedDb) -> Installer {
        let repo = IndexRepository::from_packages(self.packages.clone());
        Installer::new(&self.root, db, Box::new(repo))
            .unwrap()
            .with_tmp_dir(&self.tmp_dir)
            .with_hook_runner(Box::new(RecordingHooks::default()))
    }

    /// Path of an area entry given in artifact form (`opt/sw/a/...`)
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn installed(&self, pkg: &Package) -> bool {
        self.open_db().is_installed_locally(pkg).unwrap()
    }
}

/// Hook runner that records which packages ran a hook
#[derive(Clone, Default)]
pub struct RecordingHooks {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail: bool,
}

impl RecordingHooks {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl HookRunner for RecordingHooks {
    fn run(&self, _script: &str, env: &HookEnv) -> Result<()> {
        self.calls.lock().unwrap().push(env.package_name.clone());
        if self.fail {
            return Err(Error::PostHookError(format!(
                "hook of {} exited with status 1",
                env.package_name
            )));
        }
        Ok(())
    }
}

/// Extractor that, for artifacts whose file name starts with `victim`,
/// writes the first `written` files of the payload and then fails
pub struct FaultyExtractor {
    pub victim: String,
    pub written: usize,
    inner: TarGzExtractor,
}

impl FaultyExtractor {
    pub fn new(victim: &str, written: usize) -> Self {
        Self {
            victim: victim.to_string(),
            written,
            inner: TarGzExtractor::new(),
        }
    }
}

impl Extractor for FaultyExtractor {
    fn inspect(&self, artifact: &Path) -> Result<ArtifactManifest> {
        self.inner.inspect(artifact)
    }

    fn extract(
        &self,
        artifact: &Path,
        target: &ExtractTarget<'_>,
        journal: &mut ExtractionJournal,
    ) -> Result<Vec<FileEntry>> {
        let is_victim = artifact
            .file_name()
            .map(|n| n.to_string_lossy().starts_with(&self.victim))
            .unwrap_or(false);
        if !is_victim {
            return self.inner.extract(artifact, target, journal);
        }

        let entries = self.inspect(artifact)?.install_entries(target.relocation);
        for dir in entries.iter().filter(|e| e.is_dir()) {
            journal.create_dir_all(&safe_join(target.root, &dir.path)?)?;
        }
        for file in entries.iter().filter(|e| !e.is_dir()).take(self.written) {
            let dest = safe_join(target.root, &file.path)?;
            journal.record_file(dest.clone());
            fs::write(&dest, b"partial")?;
        }
        Err(Error::ExtractionError(format!(
            "simulated failure after {} files",
            self.written
        )))
    }
}

/// Extractor that writes the payload faithfully, then truncates the first
/// regular file it wrote
pub struct TruncatingExtractor {
    inner: TarGzExtractor,
}

impl TruncatingExtractor {
    pub fn new() -> Self {
        Self {
            inner: TarGzExtractor::new(),
        }
    }
}

impl Extractor for TruncatingExtractor {
    fn inspect(&self, artifact: &Path) -> Result<ArtifactManifest> {
        self.inner.inspect(artifact)
    }

    fn extract(
        &self,
        artifact: &Path,
        target: &ExtractTarget<'_>,
        journal: &mut ExtractionJournal,
    ) -> Result<Vec<FileEntry>> {
        let files = self.inner.extract(artifact, target, journal)?;
        if let Some(file) = files.iter().find(|f| !f.is_dir() && f.size > 0) {
            fs::write(safe_join(target.root, &file.path)?, b"")?;
        }
        Ok(files)
    }
}

/// Fetcher that hands out a corrupted copy for the first `corrupt` fetches
pub struct CorruptingFetcher {
    inner: DefaultFetcher,
    corrupt: usize,
    pub fetches: Arc<AtomicUsize>,
}

impl CorruptingFetcher {
    pub fn new(corrupt: usize) -> Self {
        Self {
            inner: DefaultFetcher::new().unwrap(),
            corrupt,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ArtifactFetcher for CorruptingFetcher {
    fn fetch(&self, pkg: &Package, dest_dir: &Path) -> Result<PathBuf> {
        let count = self.fetches.fetch_add(1, Ordering::SeqCst);
        let path = self.inner.fetch(pkg, dest_dir)?;
        if count < self.corrupt {
            fs::write(&path, b"not an artifact")?;
        }
        Ok(path)
    }

    fn verify(&self, path: &Path, pkg: &Package) -> Result<Verification> {
        self.inner.verify(path, pkg)
    }
}

/// Regular files and symlinks below `dir`, relative to it
pub fn files_below(dir: &Path) -> Vec<String> {
    if !dir.exists() {
        return Vec::new();
    }
    let mut files: Vec<String> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| !e.file_type().is_dir())
        .map(|e| {
            e.path()
                .strip_prefix(dir)
                .unwrap()
                .display()
                .to_string()
        })
        .collect();
    files.sort();
    files
}

pub fn names<'a>(packages: impl IntoIterator<Item = &'a Package>) -> Vec<String> {
    packages.into_iter().map(|p| p.name.clone()).collect()
}
