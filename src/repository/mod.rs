// src/repository/mod.rs

//! Package repositories and artifact retrieval
//!
//! - [`Repository`]: answers "which available package best satisfies this
//!   requirement" and lists what is on offer
//! - [`IndexRepository`]: repository built from JSON index files
//! - [`ArtifactFetcher`] / [`DefaultFetcher`]: obtaining and verifying
//!   artifacts

mod client;
mod download;
mod index;

pub use client::RepositoryClient;
pub use download::{ArtifactFetcher, DefaultFetcher, Verification};
pub use index::{INDEX_FILE_NAME, IndexRepository, RepositoryIndex};

use crate::error::Result;
use crate::package::{Package, PackageFilter, Requirement};

/// Source of installable packages
pub trait Repository {
    /// The highest-EVR package satisfying `req`, if any
    fn find_latest_matching(&self, req: &Requirement) -> Result<Option<Package>>;

    fn list_packages(&self, filter: &PackageFilter) -> Result<Vec<Package>>;
}
