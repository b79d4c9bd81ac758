//! Run configuration
//!
//! Loaded from a JSON file (by default `config/config.json`):
//!
//! ```json
//! {
//!   "init": [{ "mode": "clean" }],
//!   "fhir-package-cache": "/home/me/.fhir/packages",
//!   "packages": [{ "name": "hl7.fhir.us.core", "version": "6.1.0", "title": "US Core" }],
//!   "instances": "instances",
//!   "count-policy": "cardinality"
//! }
//! ```
//!
//! `MSFIND_FHIR_PACKAGE_CACHE` and `MSFIND_INSTANCES` override the file values.

use crate::aggregate::CountPolicy;
use crate::error::{Error, Result};
use msfind_package::StageMode;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/config.json";
pub const DEFAULT_INSTANCES_DIR: &str = "instances";

pub const ENV_PACKAGE_CACHE: &str = "MSFIND_FHIR_PACKAGE_CACHE";
pub const ENV_INSTANCES: &str = "MSFIND_INSTANCES";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub init: Vec<InitSettings>,

    #[serde(rename = "fhir-package-cache")]
    pub fhir_package_cache: PathBuf,

    #[serde(default)]
    pub packages: Vec<PackageSpec>,

    /// Directory of instance Bundles; `instances` under the working directory when unset
    #[serde(default)]
    pub instances: Option<PathBuf>,

    #[serde(rename = "count-policy", default)]
    pub count_policy: CountPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitSettings {
    #[serde(default)]
    pub mode: StageMode,
}

/// A package to analyze, in report order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    pub name: String,
    pub version: String,
    /// Display name used in logs
    #[serde(default)]
    pub title: Option<String>,
}

impl PackageSpec {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }
}

impl Config {
    /// Load the file at `path` and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::Configuration(format!(
                "config file not found: {}",
                path.display()
            )));
        }

        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path).format(::config::FileFormat::Json))
            .set_override_option("fhir-package-cache", env::var(ENV_PACKAGE_CACHE).ok())?
            .set_override_option("instances", env::var(ENV_INSTANCES).ok())?
            .build()?;

        let config: Config = settings.try_deserialize().map_err(|e| {
            Error::Configuration(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Staging mode of the first `init` block, `clean` when absent
    pub fn mode(&self) -> StageMode {
        self.init.first().map(|i| i.mode).unwrap_or_default()
    }

    pub fn instances_dir(&self) -> PathBuf {
        self.instances
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INSTANCES_DIR))
    }

    pub fn validate(&self) -> Result<()> {
        if self.fhir_package_cache.as_os_str().is_empty() {
            return Err(Error::Configuration(
                "fhir-package-cache must be set".to_string(),
            ));
        }
        if !self.fhir_package_cache.is_dir() {
            return Err(Error::PackageCacheMissing(self.fhir_package_cache.clone()));
        }
        for (i, package) in self.packages.iter().enumerate() {
            if package.name.trim().is_empty() || package.version.trim().is_empty() {
                return Err(Error::Configuration(format!(
                    "packages[{}] needs a name and a version",
                    i
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Config {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_original_key_layout() {
        let config = parse(json!({
            "init": [{ "mode": "keep" }],
            "fhir-package-cache": "/tmp/packages",
            "packages": [
                { "name": "hl7.fhir.us.core", "version": "6.1.0", "title": "US Core" },
                { "name": "hl7.fhir.uv.ips", "version": "1.1.0" }
            ],
            "count-policy": "occurrence"
        }));

        assert_eq!(config.mode(), StageMode::Keep);
        assert_eq!(config.packages.len(), 2);
        assert_eq!(config.packages[0].display_title(), "US Core");
        assert_eq!(config.packages[1].display_title(), "hl7.fhir.uv.ips");
        assert_eq!(config.count_policy, CountPolicy::Occurrence);
        assert_eq!(config.instances_dir(), PathBuf::from("instances"));
    }

    #[test]
    fn test_defaults() {
        let config = parse(json!({ "fhir-package-cache": "/tmp/packages" }));
        assert_eq!(config.mode(), StageMode::Clean);
        assert_eq!(config.count_policy, CountPolicy::Cardinality);
        assert!(config.packages.is_empty());
    }

    #[test]
    fn test_validate() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = parse(json!({
            "fhir-package-cache": dir.path(),
            "packages": [{ "name": "hl7.fhir.us.core", "version": "6.1.0" }]
        }));
        assert!(config.validate().is_ok());

        config.packages[0].version = String::new();
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        config.fhir_package_cache = dir.path().join("missing");
        assert!(matches!(config.validate(), Err(Error::PackageCacheMissing(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(&dir.path().join("config.json"));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
