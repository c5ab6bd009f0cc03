// src/commands/remove.rs
//! Package removal command

use super::{finish_report, load_config, open_installer, parse_specs, print_plan};
use crate::cli::AreaArgs;
use anyhow::{Context, Result};
use sitepkg::{AreaLock, Error, RemoveOptions};

pub fn cmd_remove(area: &AreaArgs, specs: &[String], opts: RemoveOptions, dry_run: bool) -> Result<()> {
    let config = load_config(area)?;
    let specs = parse_specs(specs)?;
    let installer = open_installer(&config)?;

    if dry_run {
        let tx = installer
            .dry_run_remove(&specs, &opts)
            .context("Failed to plan removal")?;
        print_plan("remove", &tx);
        return Ok(());
    }

    let _lock = AreaLock::for_database(&config.db_path())?;
    let report = match installer.remove(&specs, &opts) {
        Ok(report) => report,
        Err(Error::RemovalSafetyError(msg)) => {
            anyhow::bail!("{}\nUse --force to remove anyway", msg);
        }
        Err(e) => {
            if let Error::RemovalError { ref report, .. } = e {
                println!("{}", report);
            }
            return Err(e.into());
        }
    };
    finish_report(&report)
}
