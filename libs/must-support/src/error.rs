//! Error types for the mustSupport pipeline
//!
//! [`Error`] stops a run before any output is produced. [`Warning`] is recovered:
//! it is recorded in [`crate::Diagnostics`] and the run continues.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("FHIR package cache not found at {}", .0.display())]
    PackageCacheMissing(PathBuf),

    #[error("Package error: {0}")]
    Package(#[from] msfind_package::PackageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Recoverable conditions reported during a run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    #[error("Package {name}#{version} skipped: {reason}")]
    PackageLoad {
        name: String,
        version: String,
        reason: String,
    },

    #[error("Profile {profile}: {reason}")]
    ProfileResolution { profile: String, reason: String },

    #[error("Instance file {file} skipped: {reason}")]
    InstanceParse { file: String, reason: String },

    #[error("Element {path} matched several choice keys {keys:?}, using {chosen}")]
    PathWalkAmbiguity {
        path: String,
        keys: Vec<String>,
        chosen: String,
    },
}
