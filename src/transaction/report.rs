// src/transaction/report.rs

//! Per-package outcome of an applied transaction

use super::TransactionKind;
use crate::db::models::PostInstallStatus;
use crate::package::Package;
use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// Nothing to do, with the reason (e.g. already installed)
    Skipped(String),
    Failed(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Applied => f.write_str("applied"),
            Outcome::Skipped(reason) => write!(f, "skipped ({})", reason),
            Outcome::Failed(cause) => write!(f, "failed: {}", cause),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PackageOutcome {
    pub package: Package,
    pub outcome: Outcome,
    /// Post-install hook status; only set for installs
    pub hook: Option<PostInstallStatus>,
}

impl fmt::Display for PackageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.package, self.outcome)?;
        match self.hook {
            Some(PostInstallStatus::Error) => f.write_str(", post-install hook failed"),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransactionReport {
    kind: TransactionKind,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    entries: Vec<PackageOutcome>,
    missing: Vec<String>,
}

pub type InstallReport = TransactionReport;
pub type RemovalReport = TransactionReport;

impl TransactionReport {
    pub fn new(kind: TransactionKind) -> Self {
        Self {
            kind,
            started_at: Utc::now(),
            finished_at: None,
            entries: Vec::new(),
            missing: Vec::new(),
        }
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn entries(&self) -> &[PackageOutcome] {
        &self.entries
    }

    pub fn record_applied(&mut self, package: &Package, hook: Option<PostInstallStatus>) {
        self.push(package, Outcome::Applied, hook);
    }

    pub fn record_skipped(&mut self, package: &Package, reason: impl Into<String>) {
        self.push(package, Outcome::Skipped(reason.into()), None);
    }

    pub fn record_failed(&mut self, package: &Package, cause: impl fmt::Display) {
        self.push(package, Outcome::Failed(cause.to_string()), None);
    }

    fn push(&mut self, package: &Package, outcome: Outcome, hook: Option<PostInstallStatus>) {
        self.entries.push(PackageOutcome {
            package: package.clone(),
            outcome,
            hook,
        });
    }

    /// A requested spec that matched nothing
    pub fn record_missing(&mut self, spec: impl Into<String>) {
        self.missing.push(spec.into());
    }

    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn applied(&self) -> impl Iterator<Item = &Package> {
        self.filter(|o| matches!(o, Outcome::Applied))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &Package> {
        self.filter(|o| matches!(o, Outcome::Skipped(_)))
    }

    pub fn failed(&self) -> impl Iterator<Item = &Package> {
        self.filter(|o| matches!(o, Outcome::Failed(_)))
    }

    fn filter<F>(&self, pred: F) -> impl Iterator<Item = &Package>
    where
        F: Fn(&Outcome) -> bool,
    {
        self.entries
            .iter()
            .filter(move |e| pred(&e.outcome))
            .map(|e| &e.package)
    }

    pub fn outcome_of(&self, package: &Package) -> Option<&PackageOutcome> {
        self.entries.iter().rev().find(|e| e.package == *package)
    }

    /// Packages whose post-install hook failed
    pub fn hook_failures(&self) -> impl Iterator<Item = &Package> {
        self.entries
            .iter()
            .filter(|e| e.hook == Some(PostInstallStatus::Error))
            .map(|e| &e.package)
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none() && self.missing.is_empty()
    }
}

impl fmt::Display for TransactionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{}", entry)?;
        }
        for spec in &self.missing {
            writeln!(f, "{}: not found", spec)?;
        }
        write!(
            f,
            "{}: {} applied, {} skipped, {} failed",
            self.kind,
            self.applied().count(),
            self.skipped().count(),
            self.failed().count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let a = Package::new("a", "1", "1");
        let b = Package::new("b", "1", "1");
        let c = Package::new("c", "1", "1");

        let mut report = InstallReport::new(TransactionKind::Install);
        report.record_applied(&a, Some(PostInstallStatus::Error));
        report.record_skipped(&b, "already installed");
        assert!(report.is_success());
        report.record_failed(&c, "boom");
        report.finish();

        assert_eq!(report.applied().collect::<Vec<_>>(), vec![&a]);
        assert_eq!(report.skipped().collect::<Vec<_>>(), vec![&b]);
        assert_eq!(report.failed().collect::<Vec<_>>(), vec![&c]);
        assert_eq!(report.hook_failures().count(), 1);
        assert!(!report.is_success());
        assert!(report.finished_at().is_some());
        assert_eq!(
            report.outcome_of(&b).map(|e| &e.outcome),
            Some(&Outcome::Skipped("already installed".to_string()))
        );
        assert!(report.to_string().ends_with("install: 1 applied, 1 skipped, 1 failed"));

        let mut removal = RemovalReport::new(TransactionKind::Remove);
        removal.record_missing("ghost");
        assert!(!removal.is_success());
        assert!(removal.to_string().contains("ghost: not found"));
    }
}
