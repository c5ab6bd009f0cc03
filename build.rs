// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn flag(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).action(ArgAction::SetTrue).help(help)
}

fn specs_arg() -> Arg {
    Arg::new("specs")
        .required(true)
        .num_args(1..)
        .help("Package name, or name-version-release")
}

fn filter_args(cmd: Command) -> Command {
    cmd.arg(Arg::new("name").help("Name regular expression"))
        .arg(Arg::new("version").help("Version regular expression"))
        .arg(Arg::new("release").help("Release regular expression"))
}

fn build_cli() -> Command {
    Command::new("sitepkg")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Install relocatable packages and their dependencies into a shared software area")
        .arg(Arg::new("root").long("root").value_name("DIR").help("Root of the install area (env: SITEPKG_ROOT)"))
        .arg(Arg::new("config").long("config").value_name("FILE").help("Configuration file"))
        .arg(Arg::new("repo").long("repo").action(ArgAction::Append).help("Repository index; repeatable"))
        .arg(Arg::new("cache-dir").long("cache-dir").action(ArgAction::Append).help("Read-only artifact cache; repeatable"))
        .arg(Arg::new("chained-db").long("chained-db").action(ArgAction::Append).help("Read-only package database; repeatable"))
        .arg(Arg::new("tmp-dir").long("tmp-dir").value_name("DIR").help("Scratch directory for fetched artifacts"))
        .arg(flag("debug", "Verbose logging"))
        .subcommand(Command::new("init").about("Create the package database of an install area"))
        .subcommand(
            Command::new("install")
                .about("Install packages and their dependencies")
                .arg(specs_arg())
                .arg(flag("dry-run", "Show what would be installed"))
                .arg(flag("just-db", "Only register the packages in the database"))
                .arg(flag("overwrite", "Replace files that already exist"))
                .arg(flag("nodeps", "Install only the requested packages")),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove installed packages")
                .arg(specs_arg())
                .arg(flag("dry-run", "Show what would be removed"))
                .arg(flag("just-db", "Only drop the packages from the database"))
                .arg(flag("force", "Remove even if other packages still require them"))
                .arg(flag("with-deps", "Also remove the packages they require")),
        )
        .subcommand(
            Command::new("update")
                .about("Update installed packages to newer versions")
                .arg(specs_arg())
                .arg(flag("dry-run", "Show what would be installed"))
                .arg(flag("just-db", "Only update the database")),
        )
        .subcommand(
            Command::new("deps")
                .about("List the dependencies a package would pull in")
                .arg(Arg::new("spec").required(true)),
        )
        .subcommand(filter_args(Command::new("query").about("Search the repositories")))
        .subcommand(filter_args(Command::new("list").about("List installed packages")))
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("sitepkg.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
