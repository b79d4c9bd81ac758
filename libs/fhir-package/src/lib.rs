//! FHIR NPM packages on local disk
//!
//! - [`PackageManifest`]: the `package/package.json` manifest
//! - [`FhirPackage`]: an unpacked package folder with its JSON resources
//! - [`PackageCache`]: lookup in a `~/.fhir/packages` style cache, with version fallback
//!   through [`select_version`]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

pub mod cache;
pub mod version_resolver;

pub use cache::{prepare_work_dir, PackageCache, StageMode};
pub use version_resolver::select_version;

const MANIFEST_FILE: &str = "package.json";
const INDEX_FILE: &str = ".index.json";

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid package content: {0}")]
    InvalidContent(String),
    #[error("Missing file: {0}")]
    MissingFile(String),
    #[error("Invalid version: {0}")]
    InvalidVersion(String),
    #[error("Package cache not found at {0}")]
    CacheNotFound(String),
    #[error("Package not found in cache: {name}#{version}")]
    PackageNotFound { name: String, version: String },
}

pub type PackageResult<T> = Result<T, PackageError>;

/// Check a requested package version.
///
/// Only letters, digits, `.`, `_` and `-` are allowed, which also keeps the version safe to use
/// in a cache directory name. A version starting with a digit needs at least `major.minor`;
/// its numeric parts may end in an `x` patch wildcard.
pub fn validate_version_format(version: &str) -> PackageResult<()> {
    let invalid = |why: &str| Err(PackageError::InvalidVersion(format!("'{}' {}", version, why)));

    if version.is_empty() {
        return invalid("is empty");
    }
    if !version
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return invalid("contains characters other than letters, digits, '.', '_' and '-'");
    }

    if version.starts_with(|c: char| c.is_ascii_digit()) {
        let release = version.split('-').next().unwrap_or(version);
        let parts: Vec<&str> = release.split('.').collect();
        if parts.len() < 2 {
            return invalid("needs at least major.minor");
        }
        let numeric = |p: &&str| *p == "x" || (!p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
        if !parts.iter().all(numeric) {
            return invalid("has non-numeric release parts");
        }
    }
    Ok(())
}

/// `package.json` of a FHIR package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fhir_versions: Vec<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    /// Fields this tool does not interpret (author, license, url, ...)
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub other: Map<String, Value>,
}

impl PackageManifest {
    /// `name#version`, the cache directory name
    pub fn package_id(&self) -> String {
        format!("{}#{}", self.name, self.version)
    }

    fn check(&self) -> PackageResult<()> {
        if self.name.trim().is_empty() || self.version.trim().is_empty() {
            return Err(PackageError::InvalidContent(
                "package.json needs a name and a version".into(),
            ));
        }
        Ok(())
    }
}

/// An unpacked package: manifest plus the JSON resources next to it
#[derive(Debug, Clone)]
pub struct FhirPackage {
    pub manifest: PackageManifest,
    pub dir: PathBuf,
    /// Resources in file name order
    pub resources: Vec<Value>,
}

impl FhirPackage {
    /// Load the folder holding `package.json`.
    ///
    /// `package.json` and `.index.json` are not resources. Files that do not parse are skipped
    /// with a warning; a broken manifest is an error.
    pub fn from_directory(package_dir: &Path) -> PackageResult<Self> {
        let manifest_path = package_dir.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(PackageError::MissingFile(manifest_path.display().to_string()));
        }
        let manifest: PackageManifest = parse_json(&fs::read(&manifest_path)?)?;
        manifest.check()?;

        let mut files = Vec::new();
        for entry in fs::read_dir(package_dir)? {
            let path = entry?.path();
            let is_resource = path.is_file()
                && path.extension() == Some("json".as_ref())
                && path
                    .file_name()
                    .is_some_and(|n| n != MANIFEST_FILE && n != INDEX_FILE);
            if is_resource {
                files.push(path);
            }
        }
        files.sort();

        let mut resources = Vec::with_capacity(files.len());
        for file in files {
            match fs::read(&file).map_err(PackageError::from).and_then(|b| parse_json(&b)) {
                Ok(resource) => resources.push(resource),
                Err(e) => warn!(
                    package = %manifest.package_id(),
                    file = %file.display(),
                    error = %e,
                    "Skipping unreadable package file"
                ),
            }
        }

        Ok(Self {
            manifest,
            dir: package_dir.to_path_buf(),
            resources,
        })
    }

    /// Resources with the given `resourceType`, in file order
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a Value> + 'a {
        self.resources
            .iter()
            .filter(move |r| r.get("resourceType").and_then(Value::as_str) == Some(resource_type))
    }
}

/// Parse package JSON, tolerating a UTF-8 byte order mark and stray control characters
fn parse_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> PackageResult<T> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let text = std::str::from_utf8(bytes)
        .map_err(|e| PackageError::InvalidContent(format!("not UTF-8: {}", e)))?;
    let cleaned: String = text
        .chars()
        .filter(|&c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect();
    Ok(serde_json::from_str(cleaned.trim())?)
}
