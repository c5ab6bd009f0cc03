// src/commands/query.rs
//! Read-only commands: dependencies, repository search, installed list

use super::{load_config, open_installer};
use crate::cli::AreaArgs;
use anyhow::{Context, Result};
use sitepkg::{PackageFilter, PackageSpec};

pub fn cmd_deps(area: &AreaArgs, spec: &str) -> Result<()> {
    let config = load_config(area)?;
    let spec = PackageSpec::parse(spec).with_context(|| format!("Invalid package spec '{}'", spec))?;
    let installer = open_installer(&config)?;

    let deps = installer.list_dependencies(&spec)?;
    if deps.is_empty() {
        println!("{} has no dependencies", spec);
    }
    for pkg in deps {
        println!("{}", pkg);
    }
    Ok(())
}

fn filter(name: Option<&str>, version: Option<&str>, release: Option<&str>) -> Result<PackageFilter> {
    PackageFilter::new(name, version, release).context("Invalid filter expression")
}

pub fn cmd_query(
    area: &AreaArgs,
    name: Option<&str>,
    version: Option<&str>,
    release: Option<&str>,
) -> Result<()> {
    let config = load_config(area)?;
    let installer = open_installer(&config)?;

    for pkg in installer.query(&filter(name, version, release)?)? {
        println!("{}", pkg);
    }
    Ok(())
}

pub fn cmd_list(
    area: &AreaArgs,
    name: Option<&str>,
    version: Option<&str>,
    release: Option<&str>,
) -> Result<()> {
    let config = load_config(area)?;
    let installer = open_installer(&config)?;

    let installed = installer.list(&filter(name, version, release)?)?;
    if installed.is_empty() {
        println!("No packages installed");
        return Ok(());
    }
    for entry in installed {
        println!("{:<50} {}", entry.package.to_string(), entry.layer);
    }
    Ok(())
}
