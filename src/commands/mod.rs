// src/commands/mod.rs
//! Command handlers for the sitepkg CLI

mod install;
mod query;
mod remove;

pub use install::{cmd_install, cmd_update};
pub use query::{cmd_deps, cmd_list, cmd_query};
pub use remove::cmd_remove;

use crate::cli::AreaArgs;
use anyhow::{Context, Result, bail};
use sitepkg::transaction::TransactionReport;
use sitepkg::{InstallAreaConfig, Installer, PackageSpec, Transaction};
use tracing::{debug, info};

/// Build the area configuration from the config file and the CLI flags
pub fn load_config(area: &AreaArgs) -> Result<InstallAreaConfig> {
    let config_file = match area.config {
        Some(ref path) => Some(path.clone()),
        None => InstallAreaConfig::default_path().filter(|p| p.is_file()),
    };

    let mut config = match config_file {
        Some(path) => {
            debug!("Using configuration file {}", path.display());
            InstallAreaConfig::load(&path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?
        }
        None => {
            let Some(ref root) = area.root else {
                bail!("No install area given: use --root, SITEPKG_ROOT or a configuration file");
            };
            InstallAreaConfig::new(root)
        }
    };

    if let Some(ref root) = area.root {
        config.siteroot = root.clone();
    }
    if !area.repos.is_empty() {
        config.repositories = area.repos.clone();
    }
    if !area.cache_dirs.is_empty() {
        config.cache_dirs = area.cache_dirs.clone();
    }
    if !area.chained_dbs.is_empty() {
        config.chained_databases = area.chained_dbs.clone();
    }
    if let Some(ref tmp) = area.tmp_dir {
        config.tmp_dir = Some(tmp.clone());
    }

    config.validate().context("Invalid install area configuration")?;
    Ok(config)
}

pub fn open_installer(config: &InstallAreaConfig) -> Result<Installer> {
    Installer::from_config(config).with_context(|| {
        format!(
            "Failed to open install area {}",
            config.siteroot.display()
        )
    })
}

pub fn parse_specs(specs: &[String]) -> Result<Vec<PackageSpec>> {
    specs
        .iter()
        .map(|s| PackageSpec::parse(s).with_context(|| format!("Invalid package spec '{}'", s)))
        .collect()
}

/// Create the database of an install area
pub fn cmd_init(area: &AreaArgs) -> Result<()> {
    let config = load_config(area)?;
    let db_path = config.db_path();
    info!("Initializing package database at {}", db_path.display());

    sitepkg::db::init(&db_path).context("Failed to initialize package database")?;
    println!("Package database initialized at {}", db_path.display());
    Ok(())
}

fn print_plan(verb: &str, tx: &Transaction) {
    if tx.is_empty() {
        println!("Nothing to {}", verb);
        return;
    }
    println!("Would {} {} package(s), in order:", verb, tx.len());
    for pkg in tx {
        println!("  {}", pkg);
    }
}

/// Print a report; a report with missing specs fails the command
fn finish_report(report: &TransactionReport) -> Result<()> {
    println!("{}", report);
    if !report.missing().is_empty() {
        bail!("No package matches {}", report.missing().join(", "));
    }
    Ok(())
}
