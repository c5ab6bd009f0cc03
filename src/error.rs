// src/error.rs

//! Error types for sitepkg
//!
//! Resolution and planning errors are raised before the install area is
//! touched. Per-package failures during apply are wrapped in
//! [`Error::InstallError`] / [`Error::RemovalError`], which carry the partial
//! report so a caller can see what already went through.

use crate::transaction::{InstallReport, RemovalReport};
use thiserror::Error;

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Initialization error: {0}")]
    InitError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Download error: {0}")]
    DownloadError(String),

    #[error("Not found: {0}")]
    NotFoundError(String),

    #[error("Dependency resolution failed: {0}")]
    ResolutionError(String),

    #[error("Artifact validation failed: {0}")]
    ArtifactValidationError(String),

    #[error("Extraction failed: {0}")]
    ExtractionError(String),

    #[error("Registration failed: {0}")]
    RegistrationError(String),

    #[error("Post-install hook failed: {0}")]
    PostHookError(String),

    #[error("Removal would break installed packages: {0}")]
    RemovalSafetyError(String),

    #[error("{0} is older than or equal to the installed version {1}")]
    DowngradeError(String, String),

    #[error("{0} is newer than the installed version {1}, please use update")]
    UpgradeRequired(String, String),

    #[error("Path traversal attempt detected: {0}")]
    PathTraversal(String),

    #[error("Failed to install {package}: {cause}")]
    InstallError {
        package: String,
        cause: Box<Error>,
        report: Box<InstallReport>,
    },

    #[error("Failed to remove {package}: {cause}")]
    RemovalError {
        package: String,
        cause: Box<Error>,
        report: Box<RemovalReport>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether this error happened before anything in the install area changed
    pub fn is_planning_error(&self) -> bool {
        matches!(
            self,
            Error::ResolutionError(_)
                | Error::NotFoundError(_)
                | Error::RemovalSafetyError(_)
                | Error::DowngradeError(..)
                | Error::UpgradeRequired(..)
        )
    }
}
