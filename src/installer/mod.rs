// src/installer/mod.rs

//! Install area operations
//!
//! [`Installer`] ties the pieces together for one install area: it resolves
//! requested specs against the repository, plans a [`Transaction`], checks
//! it, and hands it to the [`Engine`]. Planning failures (unresolvable
//! versions, upgrades requested through `install`, unsafe removals) are
//! raised before anything in the area changes.

mod engine;

pub use engine::{ApplyOptions, Engine};

use crate::archive::{Extractor, TarGzExtractor};
use crate::cache::ArtifactCache;
use crate::config::InstallAreaConfig;
use crate::db::{ChainedDb, InstalledPackage};
use crate::error::{Error, Result};
use crate::filesystem::RelocationMap;
use crate::package::{Package, PackageFilter, PackageSpec};
use crate::repository::{ArtifactFetcher, DefaultFetcher, IndexRepository, Repository};
use crate::resolver::{InstallationClosure, ResolveOptions, Resolver};
use crate::scriptlet::{HookRunner, ShellHookRunner};
use crate::transaction::{InstallReport, RemovalReport, Transaction, TransactionKind};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    pub just_db: bool,
    pub overwrite: bool,
    /// Install exactly the requested packages, no dependency resolution
    pub nodeps: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveOptions {
    pub just_db: bool,
    /// Remove even if other installed packages still require the targets
    pub force: bool,
    /// Also remove what the targets require
    pub with_dependencies: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlanMode {
    Install,
    Update,
}

pub struct Installer {
    root: PathBuf,
    tmp_dir: PathBuf,
    db: ChainedDb,
    repo: Box<dyn Repository>,
    fetcher: Box<dyn ArtifactFetcher>,
    extractor: Box<dyn Extractor>,
    hooks: Box<dyn HookRunner>,
    cache: ArtifactCache,
    relocation: RelocationMap,
    ignored: Vec<String>,
}

impl Installer {
    /// Installer with the default fetcher, `.tar.gz` extractor and shell
    /// hook runner
    pub fn new(root: impl Into<PathBuf>, db: ChainedDb, repo: Box<dyn Repository>) -> Result<Self> {
        let root = root.into();
        Ok(Self {
            tmp_dir: crate::db::paths::default_tmp_dir(&root),
            root,
            db,
            repo,
            fetcher: Box::new(DefaultFetcher::new()?),
            extractor: Box::new(TarGzExtractor::new()),
            hooks: Box::new(ShellHookRunner::new()),
            cache: ArtifactCache::default(),
            relocation: RelocationMap::new(),
            ignored: Vec::new(),
        })
    }

    /// Open the install area described by `config`
    pub fn from_config(config: &InstallAreaConfig) -> Result<Self> {
        let mut db = ChainedDb::open(&config.db_path())?;
        for layer in &config.chained_databases {
            db.add_read_only_layer(layer)?;
        }
        let repo = IndexRepository::load(&config.repositories)?;

        Ok(Self::new(&config.siteroot, db, Box::new(repo))?
            .with_tmp_dir(config.tmp_dir())
            .with_cache_dirs(config.cache_dirs.clone())
            .with_relocation(config.relocation_map()?)
            .with_ignored_requirements(config.ignored_requirements.clone())
            .with_hook_runner(Box::new(
                ShellHookRunner::new().with_timeout(config.hook_timeout()),
            )))
    }

    pub fn with_tmp_dir(mut self, tmp_dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = tmp_dir.into();
        self
    }

    pub fn with_cache_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.cache = ArtifactCache::new(dirs);
        self
    }

    pub fn with_relocation(mut self, relocation: RelocationMap) -> Self {
        self.relocation = relocation;
        self
    }

    pub fn with_ignored_requirements(mut self, names: Vec<String>) -> Self {
        self.ignored = names;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Box<dyn ArtifactFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_extractor(mut self, extractor: Box<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_hook_runner(mut self, hooks: Box<dyn HookRunner>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn db(&self) -> &ChainedDb {
        &self.db
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.db, self.repo.as_ref()).with_ignored(self.ignored.iter().cloned())
    }

    fn engine(&self) -> Engine<'_> {
        Engine {
            db: &self.db,
            root: &self.root,
            tmp_dir: &self.tmp_dir,
            cache: &self.cache,
            relocation: &self.relocation,
            fetcher: self.fetcher.as_ref(),
            extractor: self.extractor.as_ref(),
            hooks: self.hooks.as_ref(),
        }
    }

    /// Repository package for `spec`, the latest if no version is given
    fn find_candidate(&self, spec: &PackageSpec) -> Result<Option<Package>> {
        self.repo.find_latest_matching(&spec.to_requirement())
    }

    /// Install `specs` and everything they need
    pub fn install(&self, specs: &[PackageSpec], opts: &InstallOptions) -> Result<InstallReport> {
        let mut report = InstallReport::new(TransactionKind::Install);
        let tx = self.plan_install(specs, opts.nodeps, PlanMode::Install, &mut report)?;

        let apply = ApplyOptions {
            just_db: opts.just_db,
            overwrite: opts.overwrite,
            replace_older: false,
        };
        self.apply_install(&tx, apply, report)
    }

    /// Plan of [`Installer::install`], without touching anything
    pub fn dry_run_install(
        &self,
        specs: &[PackageSpec],
        opts: &InstallOptions,
    ) -> Result<Transaction> {
        let mut report = InstallReport::new(TransactionKind::Install);
        self.plan_install(specs, opts.nodeps, PlanMode::Install, &mut report)
    }

    /// Move installed packages to newer versions
    ///
    /// Each target is re-resolved even though an older version is installed,
    /// installed over the old files, and the superseded versions are then
    /// removed.
    pub fn update(&self, specs: &[PackageSpec], opts: &InstallOptions) -> Result<InstallReport> {
        let mut report = InstallReport::new(TransactionKind::Install);
        let tx = self.plan_install(specs, opts.nodeps, PlanMode::Update, &mut report)?;

        let apply = ApplyOptions {
            just_db: opts.just_db,
            overwrite: true,
            replace_older: true,
        };
        self.apply_install(&tx, apply, report)
    }

    pub fn dry_run_update(
        &self,
        specs: &[PackageSpec],
        opts: &InstallOptions,
    ) -> Result<Transaction> {
        let mut report = InstallReport::new(TransactionKind::Install);
        self.plan_install(specs, opts.nodeps, PlanMode::Update, &mut report)
    }

    fn apply_install(
        &self,
        tx: &Transaction,
        apply: ApplyOptions,
        mut report: InstallReport,
    ) -> Result<InstallReport> {
        let result = self.engine().apply_install(tx, apply, &mut report);
        report.finish();
        match result {
            Ok(()) => Ok(report),
            Err((pkg, cause)) => Err(Error::InstallError {
                package: pkg.to_string(),
                cause: Box::new(cause),
                report: Box::new(report),
            }),
        }
    }

    fn plan_install(
        &self,
        specs: &[PackageSpec],
        nodeps: bool,
        mode: PlanMode,
        report: &mut InstallReport,
    ) -> Result<Transaction> {
        let resolver = self.resolver();
        let opts = match mode {
            PlanMode::Install => ResolveOptions::default(),
            PlanMode::Update => ResolveOptions::forced(),
        };

        let mut closures = Vec::new();
        for spec in specs {
            let Some(target) = self.find_candidate(spec)? else {
                warn!("No package matching {} in the repositories", spec);
                report.record_missing(spec.to_string());
                continue;
            };

            if self.db.is_installed(&target)? {
                if mode == PlanMode::Update && spec.version.is_some() {
                    return Err(Error::DowngradeError(
                        target.to_string(),
                        target.to_string(),
                    ));
                }
                info!("{} is already installed", target);
                report.record_skipped(&target, "already installed");
                continue;
            }

            let closure = if nodeps {
                InstallationClosure::without_dependencies(vec![target])
            } else {
                resolver.resolve(&target, opts)?
            };
            for notice in closure.satisfied() {
                debug!("Already satisfied: {}", notice);
            }
            closures.push(closure);
        }

        let tx = Transaction::install_plan(&closures);
        self.check_versions(&tx, mode)?;
        Ok(tx)
    }

    /// Reject plain installs of a newer version and updates that are not
    /// upgrades
    fn check_versions(&self, tx: &Transaction, mode: PlanMode) -> Result<()> {
        for pkg in tx {
            let installed = self
                .db
                .find_packages(&PackageSpec::new(pkg.name.clone()), true)?;
            let Some(newest) = installed.iter().max_by(|a, b| a.compare_version(b)) else {
                continue;
            };
            if newest == pkg {
                continue;
            }

            match (mode, pkg.compare_version(newest)) {
                (PlanMode::Install, Ordering::Greater) => {
                    return Err(Error::UpgradeRequired(pkg.to_string(), newest.to_string()));
                }
                // older versions install alongside the newer one
                (PlanMode::Install, _) => {
                    debug!("{} installs next to {}", pkg, newest);
                }
                (PlanMode::Update, Ordering::Less) | (PlanMode::Update, Ordering::Equal) => {
                    return Err(Error::DowngradeError(pkg.to_string(), newest.to_string()));
                }
                (PlanMode::Update, Ordering::Greater) => {}
            }
        }
        Ok(())
    }

    /// Remove installed packages matching `specs`
    pub fn remove(&self, specs: &[PackageSpec], opts: &RemoveOptions) -> Result<RemovalReport> {
        let mut report = RemovalReport::new(TransactionKind::Remove);
        let tx = self.plan_removal(specs, opts, &mut report)?;

        let result = self.engine().apply_removal(&tx, opts.just_db, &mut report);
        report.finish();
        match result {
            Ok(()) => Ok(report),
            Err((pkg, cause)) => Err(Error::RemovalError {
                package: pkg.to_string(),
                cause: Box::new(cause),
                report: Box::new(report),
            }),
        }
    }

    pub fn dry_run_remove(&self, specs: &[PackageSpec], opts: &RemoveOptions) -> Result<Transaction> {
        let mut report = RemovalReport::new(TransactionKind::Remove);
        self.plan_removal(specs, opts, &mut report)
    }

    fn plan_removal(
        &self,
        specs: &[PackageSpec],
        opts: &RemoveOptions,
        report: &mut RemovalReport,
    ) -> Result<Transaction> {
        let resolver = self.resolver();
        let mut targets = Vec::new();

        for spec in specs {
            let local = self.db.find_packages(spec, true)?;
            if !local.is_empty() {
                targets.extend(local);
                continue;
            }

            let elsewhere = self.db.find_packages(spec, false)?;
            if elsewhere.is_empty() {
                warn!("{} is not installed", spec);
                report.record_missing(spec.to_string());
            }
            for pkg in elsewhere {
                let layer = self
                    .db
                    .layer_of(&pkg)?
                    .map(|l| l.to_string())
                    .unwrap_or_default();
                warn!("{} comes from read-only database {}, not removing it", pkg, layer);
                report.record_skipped(&pkg, format!("installed in read-only database {}", layer));
            }
        }

        let packages = if opts.with_dependencies {
            let mut expanded = Vec::new();
            for target in &targets {
                expanded.extend(resolver.resolve_removal(target)?);
            }
            expanded
        } else {
            targets
        };

        let tx = Transaction::removal_plan(packages);
        resolver.check_removal_safety(tx.packages(), opts.force)?;
        Ok(tx)
    }

    /// Everything `spec` would pull in, regardless of what is installed
    pub fn list_dependencies(&self, spec: &PackageSpec) -> Result<Vec<Package>> {
        let target = match self.find_candidate(spec)? {
            Some(pkg) => pkg,
            None => self
                .db
                .find_packages(spec, false)?
                .into_iter()
                .max_by(|a, b| a.compare_version(b))
                .ok_or_else(|| Error::NotFoundError(format!("No package matching {}", spec)))?,
        };

        let opts = ResolveOptions {
            force: true,
            ignore_installed: true,
        };
        let closure = self.resolver().resolve(&target, opts)?;
        Ok(closure
            .into_packages()
            .into_iter()
            .filter(|p| *p != target)
            .collect())
    }

    /// Repository packages matching `filter`, sorted by name then version
    pub fn query(&self, filter: &PackageFilter) -> Result<Vec<Package>> {
        let mut packages = self.repo.list_packages(filter)?;
        packages.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.compare_version(b)));
        Ok(packages)
    }

    /// Installed packages in every database layer
    pub fn list(&self, filter: &PackageFilter) -> Result<Vec<InstalledPackage>> {
        self.db.list_packages(filter)
    }
}
