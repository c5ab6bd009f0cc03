// src/commands/install.rs
//! Install and update commands

use super::{finish_report, load_config, open_installer, parse_specs, print_plan};
use crate::cli::AreaArgs;
use anyhow::{Context, Result};
use sitepkg::{AreaLock, Error, InstallOptions};
use tracing::info;

fn report_failure(e: Error) -> anyhow::Error {
    if let Error::InstallError { ref report, .. } = e {
        println!("{}", report);
    }
    anyhow::Error::new(e)
}

pub fn cmd_install(area: &AreaArgs, specs: &[String], opts: InstallOptions, dry_run: bool) -> Result<()> {
    let config = load_config(area)?;
    let specs = parse_specs(specs)?;
    let installer = open_installer(&config)?;

    if dry_run {
        let tx = installer
            .dry_run_install(&specs, &opts)
            .context("Failed to plan installation")?;
        print_plan("install", &tx);
        return Ok(());
    }

    let _lock = AreaLock::for_database(&config.db_path())?;
    info!("Installing into {}", config.siteroot.display());
    let report = installer.install(&specs, &opts).map_err(report_failure)?;

    for pkg in report.hook_failures() {
        println!("warning: post-install hook of {} failed", pkg);
    }
    finish_report(&report)
}

pub fn cmd_update(area: &AreaArgs, specs: &[String], just_db: bool, dry_run: bool) -> Result<()> {
    let config = load_config(area)?;
    let specs = parse_specs(specs)?;
    let installer = open_installer(&config)?;
    let opts = InstallOptions {
        just_db,
        ..Default::default()
    };

    if dry_run {
        let tx = installer
            .dry_run_update(&specs, &opts)
            .context("Failed to plan update")?;
        print_plan("install", &tx);
        return Ok(());
    }

    let _lock = AreaLock::for_database(&config.db_path())?;
    let report = installer.update(&specs, &opts).map_err(report_failure)?;
    finish_report(&report)
}
