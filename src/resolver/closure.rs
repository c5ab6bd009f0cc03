// src/resolver/closure.rs

use crate::package::Package;

/// Result of one resolution pass
///
/// `packages` is in discovery order: the requested package first, then its
/// dependencies as they were found. `edges` are the `(dependent, dependency)`
/// pairs captured on the way, used later to keep application order
/// topological.
#[derive(Debug, Clone, Default)]
pub struct InstallationClosure {
    packages: Vec<Package>,
    edges: Vec<(Package, Package)>,
    satisfied: Vec<String>,
}

impl InstallationClosure {
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn into_packages(self) -> Vec<Package> {
        self.packages
    }

    pub fn edges(&self) -> &[(Package, Package)] {
        &self.edges
    }

    /// Requirements and targets found already satisfied by installed packages
    pub fn satisfied(&self) -> &[String] {
        &self.satisfied
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn contains(&self, pkg: &Package) -> bool {
        self.packages.contains(pkg)
    }

    pub(crate) fn push(&mut self, pkg: Package) {
        if !self.packages.contains(&pkg) {
            self.packages.push(pkg);
        }
    }

    pub(crate) fn add_edge(&mut self, dependent: &Package, dependency: &Package) {
        if dependent == dependency {
            return;
        }
        let edge = (dependent.clone(), dependency.clone());
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    pub(crate) fn note_satisfied(&mut self, what: String) {
        if !self.satisfied.contains(&what) {
            self.satisfied.push(what);
        }
    }

    /// Append `other`, keeping the first occurrence of each package
    pub fn merge(&mut self, other: InstallationClosure) {
        for pkg in other.packages {
            self.push(pkg);
        }
        for (dependent, dependency) in &other.edges {
            self.add_edge(dependent, dependency);
        }
        for what in other.satisfied {
            self.note_satisfied(what);
        }
    }

    /// Drop everything but the requested packages
    pub fn without_dependencies(targets: Vec<Package>) -> Self {
        let mut closure = Self::default();
        for pkg in targets {
            closure.push(pkg);
        }
        closure
    }
}
