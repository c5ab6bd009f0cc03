// src/resolver/mod.rs

//! Dependency resolution
//!
//! Install resolution walks requirements depth-first, threading a *granted*
//! set through the recursion: a package already granted in this pass is never
//! added again, which is what makes cyclic requirements terminate. For each
//! requirement the first source that can answer wins, in this order:
//!
//! 1. a package already granted in this pass
//! 2. the installed packages (any database layer)
//! 3. the repository's latest matching package
//!
//! There is no backtracking: one provider is chosen per requirement and a
//! requirement nobody provides is skipped.
//!
//! Removal resolution follows the target's own requirements and schedules
//! the locally installed providers for removal as well.

mod closure;

pub use closure::InstallationClosure;

use crate::db::ChainedDb;
use crate::error::{Error, Result};
use crate::package::{Package, PackageOrList, Requirement};
use crate::repository::Repository;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Knobs for install resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Resolve a target even if it is already installed
    pub force: bool,
    /// Do not treat installed packages as providers
    pub ignore_installed: bool,
}

impl ResolveOptions {
    pub fn forced() -> Self {
        Self {
            force: true,
            ignore_installed: false,
        }
    }
}

pub struct Resolver<'a> {
    db: &'a ChainedDb,
    repo: &'a dyn Repository,
    ignored: HashSet<String>,
}

impl<'a> Resolver<'a> {
    pub fn new(db: &'a ChainedDb, repo: &'a dyn Repository) -> Self {
        Self {
            db,
            repo,
            ignored: HashSet::new(),
        }
    }

    /// Requirement names that are never resolved
    pub fn with_ignored<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored.extend(names.into_iter().map(Into::into));
        self
    }

    fn is_ignored(&self, req: &Requirement) -> bool {
        self.ignored.contains(&req.name)
    }

    /// Closure of `target` in discovery order
    pub fn resolve(&self, target: &Package, opts: ResolveOptions) -> Result<InstallationClosure> {
        let mut granted = HashSet::new();
        self.resolve_with(target, opts, &mut granted)
    }

    /// Resolve each target independently and merge, first seen wins
    pub fn resolve_all(
        &self,
        targets: impl Into<PackageOrList>,
        opts: ResolveOptions,
    ) -> Result<InstallationClosure> {
        let mut merged = InstallationClosure::default();
        for target in targets.into().into_vec() {
            merged.merge(self.resolve(&target, opts)?);
        }
        Ok(merged)
    }

    fn resolve_with(
        &self,
        target: &Package,
        opts: ResolveOptions,
        granted: &mut HashSet<Package>,
    ) -> Result<InstallationClosure> {
        let mut closure = InstallationClosure::default();

        if !opts.force && self.db.is_installed(target)? {
            warn!("{} is already installed", target);
            closure.note_satisfied(target.to_string());
            return Ok(closure);
        }

        granted.insert(target.clone());
        closure.push(target.clone());

        for req in &target.requires {
            req.validate().map_err(|e| match e {
                Error::ResolutionError(msg) => {
                    Error::ResolutionError(format!("{} (required by {})", msg, target))
                }
                other => other,
            })?;
            if self.is_ignored(req) {
                debug!("Ignoring requirement {} of {}", req, target);
                continue;
            }

            if let Some(provider) = granted.iter().find(|p| p.fulfills(req)) {
                closure.add_edge(target, provider);
                continue;
            }

            if !opts.ignore_installed && self.db.provides(req)? {
                info!("{} (required by {}) is already satisfied", req, target);
                closure.note_satisfied(req.to_string());
                continue;
            }

            let Some(candidate) = self.repo.find_latest_matching(req)? else {
                debug!("No provider for {} (required by {})", req, target);
                continue;
            };

            closure.add_edge(target, &candidate);
            if granted.contains(&candidate) {
                continue;
            }

            debug!("{} pulls in {}", target, candidate);
            let sub = self.resolve_with(&candidate, opts, granted)?;
            closure.merge(sub);
        }

        Ok(closure)
    }

    /// Removal closure of `target`: the target, then the locally installed
    /// providers of its requirements, recursively
    pub fn resolve_removal(&self, target: &Package) -> Result<Vec<Package>> {
        let mut scheduled = Vec::new();
        self.resolve_removal_with(target, &mut scheduled)?;
        Ok(scheduled)
    }

    fn resolve_removal_with(&self, target: &Package, scheduled: &mut Vec<Package>) -> Result<()> {
        scheduled.push(target.clone());

        for req in &target.requires {
            if self.is_ignored(req) {
                continue;
            }
            let Some(provider) = self.db.find_provider(req, true)? else {
                continue;
            };
            if scheduled.contains(&provider) {
                continue;
            }
            debug!("Removing {} pulls in {}", target, provider);
            self.resolve_removal_with(&provider, scheduled)?;
        }
        Ok(())
    }

    /// Reject removing `packages` if an installed package outside the set
    /// still requires one of them, unless `force`
    pub fn check_removal_safety(&self, packages: &[Package], force: bool) -> Result<()> {
        let mut problems = Vec::new();

        for pkg in packages {
            let blockers: Vec<String> = self
                .db
                .packages_requiring(pkg)?
                .into_iter()
                .filter(|dependent| !packages.contains(dependent))
                .map(|dependent| dependent.to_string())
                .collect();

            if !blockers.is_empty() {
                problems.push(format!("{} is required by {}", pkg, blockers.join(", ")));
            }
        }

        if problems.is_empty() {
            return Ok(());
        }
        if force {
            for problem in &problems {
                warn!("Forcing removal: {}", problem);
            }
            return Ok(());
        }
        Err(Error::RemovalSafetyError(problems.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::LocalDb;
    use crate::repository::IndexRepository;
    use crate::version::Comparator;

    fn pkg(name: &str, requires: &[&str]) -> Package {
        Package::new(name, "1.0", "1")
            .with_requires(requires.iter().map(|r| Requirement::new(*r)).collect())
    }

    fn names(packages: &[Package]) -> Vec<&str> {
        packages.iter().map(|p| p.name.as_str()).collect()
    }

    fn empty_db() -> ChainedDb {
        ChainedDb::new(LocalDb::open_in_memory().unwrap())
    }

    #[test]
    fn test_discovery_order() {
        let repo = IndexRepository::from_packages(vec![
            pkg("A", &["B", "C"]),
            pkg("B", &["D"]),
            pkg("C", &[]),
            pkg("D", &[]),
        ]);
        let db = empty_db();
        let resolver = Resolver::new(&db, &repo);

        let closure = resolver
            .resolve(&pkg("A", &["B", "C"]), ResolveOptions::default())
            .unwrap();
        assert_eq!(names(closure.packages()), vec!["A", "B", "D", "C"]);
        assert_eq!(closure.edges().len(), 3);
    }

    #[test]
    fn test_cycle_terminates() {
        let repo = IndexRepository::from_packages(vec![pkg("A", &["B"]), pkg("B", &["A"])]);
        let db = empty_db();
        let closure = Resolver::new(&db, &repo)
            .resolve(&pkg("A", &["B"]), ResolveOptions::default())
            .unwrap();
        assert_eq!(names(closure.packages()), vec!["A", "B"]);
    }

    #[test]
    fn test_malformed_requirement_fails_resolution() {
        let mut req = Requirement::new("B");
        req.comparator = Comparator::Ge;
        let a = Package::new("A", "1.0", "1").with_requires(vec![req]);
        let repo = IndexRepository::from_packages(vec![a.clone(), pkg("B", &[])]);
        let db = empty_db();

        let err = Resolver::new(&db, &repo)
            .resolve(&a, ResolveOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::ResolutionError(ref msg) if msg.contains("A-1.0-1")));
        assert!(err.is_planning_error());
    }

    #[test]
    fn test_installed_target_short_circuits() {
        let repo = IndexRepository::from_packages(vec![pkg("A", &["B"]), pkg("B", &[])]);
        let db = empty_db();
        db.add_package(&pkg("A", &["B"]), &[]).unwrap();

        let resolver = Resolver::new(&db, &repo);
        let closure = resolver
            .resolve(&pkg("A", &["B"]), ResolveOptions::default())
            .unwrap();
        assert!(closure.is_empty());
        assert_eq!(closure.satisfied().len(), 1);

        let forced = resolver
            .resolve(&pkg("A", &["B"]), ResolveOptions::forced())
            .unwrap();
        assert_eq!(names(forced.packages()), vec!["A", "B"]);
    }

    #[test]
    fn test_installed_dependency_is_satisfied() {
        let repo = IndexRepository::from_packages(vec![pkg("A", &["B"]), pkg("B", &[])]);
        let db = empty_db();
        db.add_package(&pkg("B", &[]), &[]).unwrap();

        let resolver = Resolver::new(&db, &repo);
        let closure = resolver
            .resolve(&pkg("A", &["B"]), ResolveOptions::default())
            .unwrap();
        assert_eq!(names(closure.packages()), vec!["A"]);

        let opts = ResolveOptions {
            force: false,
            ignore_installed: true,
        };
        let closure = resolver.resolve(&pkg("A", &["B"]), opts).unwrap();
        assert_eq!(names(closure.packages()), vec!["A", "B"]);
    }

    #[test]
    fn test_versioned_requirement_goes_to_repository() {
        let b2 = Package::new("B", "2.0", "1");
        let repo = IndexRepository::from_packages(vec![pkg("B", &[]), b2.clone()]);
        let db = empty_db();
        db.add_package(&pkg("B", &[]), &[]).unwrap();

        let a = Package::new("A", "1.0", "1").with_requires(vec![Requirement::versioned(
            "B",
            Comparator::Ge,
            "2.0",
            None,
        )]);
        let closure = Resolver::new(&db, &repo)
            .resolve(&a, ResolveOptions::default())
            .unwrap();
        assert_eq!(closure.packages(), &[a, b2]);
    }

    #[test]
    fn test_unknown_and_ignored_requirements_are_skipped() {
        let repo = IndexRepository::from_packages(vec![pkg("B", &[])]);
        let db = empty_db();
        let resolver = Resolver::new(&db, &repo).with_ignored(["B"]);

        let closure = resolver
            .resolve(&pkg("A", &["B", "/bin/sh"]), ResolveOptions::default())
            .unwrap();
        assert_eq!(names(closure.packages()), vec!["A"]);
    }

    #[test]
    fn test_resolve_all_dedups_in_first_seen_order() {
        let repo = IndexRepository::from_packages(vec![
            pkg("A", &["C"]),
            pkg("B", &["C"]),
            pkg("C", &[]),
        ]);
        let db = empty_db();
        let closure = Resolver::new(&db, &repo)
            .resolve_all(
                vec![pkg("A", &["C"]), pkg("B", &["C"])],
                ResolveOptions::default(),
            )
            .unwrap();
        assert_eq!(names(closure.packages()), vec!["A", "C", "B"]);
    }

    #[test]
    fn test_removal_closure_and_safety() {
        let repo = IndexRepository::default();
        let db = empty_db();
        let a = pkg("A", &["B"]);
        let b = pkg("B", &["C"]);
        let c = pkg("C", &[]);
        let d = pkg("D", &["C"]);
        for p in [&a, &b, &c, &d] {
            db.add_package(p, &[]).unwrap();
        }

        let resolver = Resolver::new(&db, &repo);
        let closure = resolver.resolve_removal(&a).unwrap();
        assert_eq!(names(&closure), vec!["A", "B", "C"]);

        // D still needs C
        assert!(matches!(
            resolver.check_removal_safety(&closure, false),
            Err(Error::RemovalSafetyError(_))
        ));
        resolver.check_removal_safety(&closure, true).unwrap();

        resolver.check_removal_safety(&[a.clone()], false).unwrap();
        assert!(resolver.check_removal_safety(&[b], false).is_err());
    }
}
