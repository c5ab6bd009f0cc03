// src/main.rs

use anyhow::Result;
use clap::Parser;
use sitepkg::{InstallOptions, RemoveOptions};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let area = &cli.area;
    match cli.command {
        Commands::Init => commands::cmd_init(area),
        Commands::Install {
            specs,
            dry_run,
            just_db,
            overwrite,
            nodeps,
        } => {
            let opts = InstallOptions {
                just_db,
                overwrite,
                nodeps,
            };
            commands::cmd_install(area, &specs, opts, dry_run)
        }
        Commands::Remove {
            specs,
            dry_run,
            just_db,
            force,
            with_deps,
        } => {
            let opts = RemoveOptions {
                just_db,
                force,
                with_dependencies: with_deps,
            };
            commands::cmd_remove(area, &specs, opts, dry_run)
        }
        Commands::Update {
            specs,
            dry_run,
            just_db,
        } => commands::cmd_update(area, &specs, just_db, dry_run),
        Commands::Deps { spec } => commands::cmd_deps(area, &spec),
        Commands::Query {
            name,
            version,
            release,
        } => commands::cmd_query(
            area,
            name.as_deref(),
            version.as_deref(),
            release.as_deref(),
        ),
        Commands::List {
            name,
            version,
            release,
        } => commands::cmd_list(
            area,
            name.as_deref(),
            version.as_deref(),
            release.as_deref(),
        ),
    }
}
