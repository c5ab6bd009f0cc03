// src/config.rs

//! Install area configuration
//!
//! A TOML file describing one install area:
//!
//! ```toml
//! siteroot = "/cvmfs/lhcb.cern.ch/lib"
//! repositories = ["https://example.org/repo/index.json"]
//! cache_dirs = ["/scratch/rpmcache"]
//! chained_databases = ["/cvmfs/shared/var/lib/sitepkg/packages.db"]
//! ignored_requirements = ["/bin/sh"]
//! hook_timeout_secs = 300
//!
//! [relocate]
//! "/opt/lcg" = "/lcg/releases"
//! ```
//!
//! Relative `db_path` and `tmp_dir` values are taken relative to `siteroot`.

use crate::db::paths::{default_db_path, default_tmp_dir};
use crate::error::{Error, Result};
use crate::filesystem::RelocationMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default hook timeout in seconds
pub const DEFAULT_HOOK_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallAreaConfig {
    /// Root of the install area
    pub siteroot: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmp_dir: Option<PathBuf>,

    /// Read-only artifact caches, searched in order
    #[serde(default)]
    pub cache_dirs: Vec<PathBuf>,

    /// Archive prefix -> install area prefix
    #[serde(default)]
    pub relocate: BTreeMap<String, String>,

    /// Read-only package databases consulted after the local one
    #[serde(default)]
    pub chained_databases: Vec<PathBuf>,

    /// Repository index locations
    #[serde(default)]
    pub repositories: Vec<String>,

    /// Requirement names never resolved
    #[serde(default)]
    pub ignored_requirements: Vec<String>,

    #[serde(default = "default_hook_timeout")]
    pub hook_timeout_secs: u64,
}

fn default_hook_timeout() -> u64 {
    DEFAULT_HOOK_TIMEOUT_SECS
}

impl InstallAreaConfig {
    pub fn new(siteroot: impl Into<PathBuf>) -> Self {
        Self {
            siteroot: siteroot.into(),
            db_path: None,
            tmp_dir: None,
            cache_dirs: Vec::new(),
            relocate: BTreeMap::new(),
            chained_databases: Vec::new(),
            repositories: Vec::new(),
            ignored_requirements: Vec::new(),
            hook_timeout_secs: DEFAULT_HOOK_TIMEOUT_SECS,
        }
    }

    /// Per-user config file, `~/.config/sitepkg/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("sitepkg").join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        debug!("Loading configuration from {}", path.display());
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.siteroot.as_os_str().is_empty() {
            return Err(Error::ConfigError("siteroot must not be empty".to_string()));
        }
        if self.hook_timeout_secs == 0 {
            return Err(Error::ConfigError(
                "hook_timeout_secs must be positive".to_string(),
            ));
        }
        self.relocation_map()?;
        Ok(())
    }

    fn under_root(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.siteroot.join(path)
        }
    }

    pub fn db_path(&self) -> PathBuf {
        match self.db_path {
            Some(ref p) => self.under_root(p),
            None => default_db_path(&self.siteroot),
        }
    }

    pub fn tmp_dir(&self) -> PathBuf {
        match self.tmp_dir {
            Some(ref p) => self.under_root(p),
            None => default_tmp_dir(&self.siteroot),
        }
    }

    pub fn relocation_map(&self) -> Result<RelocationMap> {
        RelocationMap::from_map(&self.relocate)
    }

    pub fn hook_timeout(&self) -> Duration {
        Duration::from_secs(self.hook_timeout_secs)
    }
}
