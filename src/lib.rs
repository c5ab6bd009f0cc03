// src/lib.rs

//! sitepkg: package installer for shared software areas
//!
//! Installs relocatable `.tar.gz` packages, with their dependencies, into an
//! install area that is not managed by the system package manager (a shared
//! filesystem, a CVMFS stratum, a user prefix).
//!
//! # Architecture
//!
//! - Database-first: every installed package and file is recorded in SQLite
//! - Chained databases: an area can see packages installed in read-only
//!   shared areas and will not install them again
//! - Resolution is greedy and depth-first: one provider per requirement,
//!   no backtracking
//! - Per-package atomicity: a package that fails to extract or register is
//!   rolled back; packages installed before it stay
//!
//! # Example
//!
//! ```ignore
//! use sitepkg::{InstallAreaConfig, InstallOptions, Installer, PackageSpec};
//!
//! let config = InstallAreaConfig::load(path)?;
//! let installer = Installer::from_config(&config)?;
//! let report = installer.install(&[PackageSpec::parse("gaudi")?], &InstallOptions::default())?;
//! ```

pub mod archive;
pub mod cache;
pub mod config;
pub mod db;
mod error;
pub mod filesystem;
pub mod hash;
pub mod installer;
pub mod lock;
pub mod package;
pub mod repository;
pub mod resolver;
pub mod scriptlet;
pub mod transaction;
pub mod version;

pub use config::InstallAreaConfig;
pub use error::{Error, Result};
pub use installer::{InstallOptions, Installer, RemoveOptions};
pub use lock::AreaLock;
pub use package::{Package, PackageFilter, PackageOrList, PackageSpec, Requirement};
pub use transaction::{InstallReport, RemovalReport, Transaction};
