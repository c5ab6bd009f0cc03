// src/installer/engine.rs

//! Per-package apply protocol
//!
//! Install, for each package in application order:
//!
//! 1. locate the artifact in the cache directories, else fetch it into the
//!    scratch directory
//! 2. verify it; a bad artifact is fetched again once
//! 3. extract it (skipped with `just_db`)
//! 4. register the package and its file list
//! 5. compare what is on disk with the artifact metadata
//! 6. any failure in 3-5 deletes what this package wrote and its record
//! 7. run the post-install hook; failure is recorded, not rolled back
//! 8. delete the artifact unless it came from a cache directory
//!
//! The first failing package stops the transaction. Packages applied before
//! it stay installed.

use crate::archive::{self, ArtifactManifest, ExtractTarget, ExtractionJournal, Extractor};
use crate::cache::ArtifactCache;
use crate::db::ChainedDb;
use crate::db::models::{FileEntry, PostInstallStatus};
use crate::error::{Error, Result};
use crate::filesystem::{RelocationMap, safe_join};
use crate::package::Package;
use crate::repository::{ArtifactFetcher, Verification};
use crate::scriptlet::{HookEnv, HookRunner};
use crate::transaction::{InstallReport, RemovalReport, Transaction};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Flags for applying an install transaction
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    /// Only register packages, never touch the install area
    pub just_db: bool,
    /// Replace files that already exist
    pub overwrite: bool,
    /// Remove same-name packages superseded by the one just installed
    pub replace_older: bool,
}

/// Artifact on disk and whether it belongs to a cache directory
struct LocatedArtifact {
    path: PathBuf,
    cached: bool,
}

pub struct Engine<'a> {
    pub(crate) db: &'a ChainedDb,
    pub(crate) root: &'a Path,
    pub(crate) tmp_dir: &'a Path,
    pub(crate) cache: &'a ArtifactCache,
    pub(crate) relocation: &'a RelocationMap,
    pub(crate) fetcher: &'a dyn ArtifactFetcher,
    pub(crate) extractor: &'a dyn Extractor,
    pub(crate) hooks: &'a dyn HookRunner,
}

impl<'a> Engine<'a> {
    /// Apply `tx`, recording each package in `report`
    ///
    /// Returns the failing package and its cause on the first failure.
    pub fn apply_install(
        &self,
        tx: &Transaction,
        opts: ApplyOptions,
        report: &mut InstallReport,
    ) -> std::result::Result<(), (Package, Error)> {
        for pkg in tx {
            if self.db.is_installed(pkg).map_err(|e| (pkg.clone(), e))? {
                info!("{} is already installed", pkg);
                report.record_skipped(pkg, "already installed");
                continue;
            }

            let superseded = if opts.replace_older {
                self.superseded_by(pkg).map_err(|e| (pkg.clone(), e))?
            } else {
                Vec::new()
            };

            match self.install_package(pkg, opts) {
                Ok(hook) => report.record_applied(pkg, hook),
                Err(e) => {
                    warn!("Installing {} failed: {}", pkg, e);
                    report.record_failed(pkg, &e);
                    return Err((pkg.clone(), e));
                }
            }

            for old in &superseded {
                info!("{} supersedes {}", pkg, old);
                if let Err(e) = self.remove_package(old, opts.just_db) {
                    report.record_failed(old, &e);
                    return Err((old.clone(), e));
                }
            }
        }
        Ok(())
    }

    /// Remove every package of `tx`, in order
    pub fn apply_removal(
        &self,
        tx: &Transaction,
        just_db: bool,
        report: &mut RemovalReport,
    ) -> std::result::Result<(), (Package, Error)> {
        for pkg in tx {
            match self.remove_package(pkg, just_db) {
                Ok(()) => report.record_applied(pkg, None),
                Err(e) => {
                    warn!("Removing {} failed: {}", pkg, e);
                    report.record_failed(pkg, &e);
                    return Err((pkg.clone(), e));
                }
            }
        }
        Ok(())
    }

    /// Locally installed packages with the same name as `pkg`
    fn superseded_by(&self, pkg: &Package) -> Result<Vec<Package>> {
        let spec = crate::package::PackageSpec::new(pkg.name.clone());
        Ok(self
            .db
            .find_packages(&spec, true)?
            .into_iter()
            .filter(|p| p != pkg)
            .collect())
    }

    /// Install one package; returns the hook status when a hook ran
    pub fn install_package(
        &self,
        pkg: &Package,
        opts: ApplyOptions,
    ) -> Result<Option<PostInstallStatus>> {
        info!("Installing {}", pkg);

        let artifact = self.locate(pkg)?;
        let artifact = self.validate(pkg, artifact)?;

        let outcome = self
            .unpack_and_register(pkg, &artifact.path, opts)
            .map(|manifest| {
                if opts.just_db {
                    None
                } else {
                    self.run_hook(pkg, &manifest)
                }
            });

        self.cleanup(&artifact);
        outcome
    }

    fn locate(&self, pkg: &Package) -> Result<LocatedArtifact> {
        if let Some(path) = self.cache.locate(pkg) {
            return Ok(LocatedArtifact { path, cached: true });
        }
        let path = self.fetcher.fetch(pkg, self.tmp_dir)?;
        Ok(LocatedArtifact {
            cached: self.cache.contains(&path),
            path,
        })
    }

    /// Verify the artifact, fetching a fresh copy once if it is bad
    fn validate(&self, pkg: &Package, artifact: LocatedArtifact) -> Result<LocatedArtifact> {
        let reason = match self.verify(pkg, &artifact.path)? {
            Verification::Invalid(reason) => reason,
            Verification::Valid | Verification::Unchecked => return Ok(artifact),
        };

        warn!("Artifact of {} is invalid ({}), fetching it again", pkg, reason);
        self.cleanup(&artifact);

        let path = self.fetcher.fetch(pkg, self.tmp_dir)?;
        let retry = LocatedArtifact {
            cached: self.cache.contains(&path),
            path,
        };
        match self.verify(pkg, &retry.path)? {
            Verification::Invalid(reason) => {
                self.cleanup(&retry);
                Err(Error::ArtifactValidationError(format!("{}: {}", pkg, reason)))
            }
            Verification::Valid | Verification::Unchecked => Ok(retry),
        }
    }

    /// Checksum verification; without a checksum the artifact must at least
    /// be readable
    fn verify(&self, pkg: &Package, path: &Path) -> Result<Verification> {
        match self.fetcher.verify(path, pkg)? {
            Verification::Unchecked => match self.extractor.inspect(path) {
                Ok(_) => Ok(Verification::Unchecked),
                Err(e) => Ok(Verification::Invalid(e.to_string())),
            },
            verdict => Ok(verdict),
        }
    }

    /// Steps 3 to 5, all or nothing
    fn unpack_and_register(
        &self,
        pkg: &Package,
        artifact: &Path,
        opts: ApplyOptions,
    ) -> Result<ArtifactManifest> {
        let mut journal = ExtractionJournal::new();
        let mut registered = false;

        let result =
            self.try_unpack_and_register(pkg, artifact, opts, &mut journal, &mut registered);
        if let Err(ref e) = result {
            warn!("Rolling back {}: {}", pkg, e);
            journal.rollback();
            if registered && let Err(db_err) = self.db.remove_package(pkg) {
                warn!("Could not drop the record of {}: {}", pkg, db_err);
            }
        }
        result
    }

    fn try_unpack_and_register(
        &self,
        pkg: &Package,
        artifact: &Path,
        opts: ApplyOptions,
        journal: &mut ExtractionJournal,
        registered: &mut bool,
    ) -> Result<ArtifactManifest> {
        let manifest = self.extractor.inspect(artifact).map_err(as_extraction_error)?;

        let files: Vec<FileEntry> = if opts.just_db {
            manifest.install_entries(self.relocation)
        } else {
            let target = ExtractTarget {
                root: self.root,
                relocation: self.relocation,
                overwrite: opts.overwrite,
            };
            self.extractor
                .extract(artifact, &target, journal)
                .map_err(as_extraction_error)?
        };
        debug!("{} has {} entries", pkg, files.len());

        self.db
            .add_package(pkg, &files)
            .map_err(|e| Error::RegistrationError(format!("{}: {}", pkg, e)))?;
        *registered = true;

        if !opts.just_db {
            archive::check_extracted(self.root, &files)?;
        }
        Ok(manifest)
    }

    fn run_hook(&self, pkg: &Package, manifest: &ArtifactManifest) -> Option<PostInstallStatus> {
        let script = manifest.post_install.as_ref()?;

        let install_prefix = match manifest.install_prefix(self.relocation) {
            Some(ref p) if p != "/" => {
                safe_join(self.root, p).unwrap_or_else(|_| self.root.to_path_buf())
            }
            _ => self.root.to_path_buf(),
        };
        let env = HookEnv {
            package_name: pkg.name.clone(),
            package_version: pkg.version.clone(),
            install_prefix,
            root: self.root.to_path_buf(),
        };

        self.set_hook_status(pkg, PostInstallStatus::NotRun);
        let status = match self.hooks.run(script, &env) {
            Ok(()) => PostInstallStatus::Success,
            Err(e) => {
                warn!("Post-install hook of {} failed: {}", pkg, e);
                PostInstallStatus::Error
            }
        };
        self.set_hook_status(pkg, status);
        Some(status)
    }

    fn set_hook_status(&self, pkg: &Package, status: PostInstallStatus) {
        if let Err(e) = self.db.set_post_install_status(pkg, status) {
            warn!("Cannot record hook status of {}: {}", pkg, e);
        }
    }

    fn cleanup(&self, artifact: &LocatedArtifact) {
        if artifact.cached || self.cache.contains(&artifact.path) {
            return;
        }
        match fs::remove_file(&artifact.path) {
            Ok(()) => debug!("Removed {}", artifact.path.display()),
            Err(e) => debug!("Could not remove {}: {}", artifact.path.display(), e),
        }
    }

    /// Removal protocol: files, then directories, then the record
    pub fn remove_package(&self, pkg: &Package, just_db: bool) -> Result<()> {
        if !self.db.is_installed_locally(pkg)? {
            return Err(Error::NotFoundError(format!(
                "{} is not installed in this area",
                pkg
            )));
        }
        info!("Removing {}", pkg);

        if !just_db {
            let mut owned = Vec::new();
            for file in self.db.file_entries(pkg)? {
                if file.is_dir() || !self.db.is_shared_path(pkg, &file.path)? {
                    owned.push(file);
                }
            }
            let removed = archive::remove_files(self.root, &owned)?;
            debug!("Removed {} paths of {}", removed, pkg);
        }

        self.db.remove_package(pkg)?;
        Ok(())
    }
}

fn as_extraction_error(e: Error) -> Error {
    match e {
        Error::ExtractionError(_) => e,
        other => Error::ExtractionError(other.to_string()),
    }
}
