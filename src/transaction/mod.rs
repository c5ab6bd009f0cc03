// src/transaction/mod.rs

//! Transactions: what gets applied, in which order, and what happened
//!
//! An install transaction is built from resolution closures:
//!
//! ```text
//! closures (discovery order) -> concatenate -> stable dedup -> reverse -> application order
//! ```
//!
//! so dependencies land before their dependents. Merging several closures can
//! put a dependent ahead of a dependency it shares with a later request; the
//! captured requirement edges are used to restore a topological order while
//! moving as little as possible (see [`application_order`]).
//!
//! Removal transactions are deduplicated but keep the order they were given.

mod order;
mod report;

pub use order::application_order;
pub use report::{InstallReport, Outcome, PackageOutcome, RemovalReport, TransactionReport};

use crate::package::Package;
use crate::resolver::InstallationClosure;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Install,
    Remove,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Install => f.write_str("install"),
            TransactionKind::Remove => f.write_str("remove"),
        }
    }
}

/// Ordered set of packages to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    kind: TransactionKind,
    packages: Vec<Package>,
}

/// Keep the first occurrence of each package
pub fn dedup_stable<I>(packages: I) -> Vec<Package>
where
    I: IntoIterator<Item = Package>,
{
    let mut unique: Vec<Package> = Vec::new();
    for pkg in packages {
        if !unique.contains(&pkg) {
            unique.push(pkg);
        }
    }
    unique
}

impl Transaction {
    /// Application order for installing the given closures
    pub fn install_plan(closures: &[InstallationClosure]) -> Self {
        let discovery = dedup_stable(closures.iter().flat_map(|c| c.packages().iter().cloned()));
        let edges: Vec<(Package, Package)> = closures
            .iter()
            .flat_map(|c| c.edges().iter().cloned())
            .collect();

        Self {
            kind: TransactionKind::Install,
            packages: application_order(&discovery, &edges),
        }
    }

    pub fn removal_plan(packages: Vec<Package>) -> Self {
        Self {
            kind: TransactionKind::Remove,
            packages: dedup_stable(packages),
        }
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Package> {
        self.packages.iter()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl<'a> IntoIterator for &'a Transaction {
    type Item = &'a Package;
    type IntoIter = std::slice::Iter<'a, Package>;

    fn into_iter(self) -> Self::IntoIter {
        self.packages.iter()
    }
}
