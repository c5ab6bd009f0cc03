// src/cli.rs
//! Command-line interface definitions
//!
//! The command implementations live in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sitepkg")]
#[command(version)]
#[command(about = "Install relocatable packages and their dependencies into a shared software area", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub area: AreaArgs,

    /// Verbose logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options describing the install area; they override the config file
#[derive(Args, Debug, Clone, Default)]
pub struct AreaArgs {
    /// Root of the install area
    #[arg(long, global = true, env = "SITEPKG_ROOT")]
    pub root: Option<PathBuf>,

    /// Configuration file (default: ~/.config/sitepkg/config.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Repository index (path, file:// or http(s):// URL); repeatable
    #[arg(long = "repo", global = true)]
    pub repos: Vec<String>,

    /// Read-only artifact cache directory; repeatable, searched in order
    #[arg(long = "cache-dir", global = true)]
    pub cache_dirs: Vec<PathBuf>,

    /// Read-only package database to chain after the local one; repeatable
    #[arg(long = "chained-db", global = true)]
    pub chained_dbs: Vec<PathBuf>,

    /// Scratch directory for fetched artifacts
    #[arg(long, global = true)]
    pub tmp_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the package database of an install area
    Init,

    /// Install packages and their dependencies
    Install {
        /// Package name, or name-version-release
        #[arg(required = true)]
        specs: Vec<String>,

        /// Show what would be installed without installing
        #[arg(long)]
        dry_run: bool,

        /// Only register the packages in the database
        #[arg(long)]
        just_db: bool,

        /// Replace files that already exist in the install area
        #[arg(long)]
        overwrite: bool,

        /// Install only the requested packages
        #[arg(long)]
        nodeps: bool,
    },

    /// Remove installed packages
    Remove {
        #[arg(required = true)]
        specs: Vec<String>,

        /// Show what would be removed without removing
        #[arg(long)]
        dry_run: bool,

        /// Only drop the packages from the database
        #[arg(long)]
        just_db: bool,

        /// Remove even if other packages still require them
        #[arg(long)]
        force: bool,

        /// Also remove the packages they require
        #[arg(long)]
        with_deps: bool,
    },

    /// Update installed packages to newer versions
    Update {
        #[arg(required = true)]
        specs: Vec<String>,

        #[arg(long)]
        dry_run: bool,

        #[arg(long)]
        just_db: bool,
    },

    /// List the dependencies a package would pull in
    Deps {
        spec: String,
    },

    /// Search the repositories (regular expressions)
    Query {
        name: Option<String>,
        version: Option<String>,
        release: Option<String>,
    },

    /// List installed packages (regular expressions)
    List {
        name: Option<String>,
        version: Option<String>,
        release: Option<String>,
    },
}
