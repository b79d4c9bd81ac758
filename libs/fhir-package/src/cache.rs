//! Local FHIR package cache
//!
//! Reads packages from a cache laid out like `~/.fhir/packages`:
//! `<root>/<name>#<version>/package/package.json`. Nothing is downloaded; a package
//! that is not in the cache is reported as [`PackageError::PackageNotFound`].

use crate::version_resolver::{is_version_alias, select_version};
use crate::{validate_version_format, FhirPackage, PackageError, PackageResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What to do with previously staged package copies at the start of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageMode {
    /// Remove the staging directory and copy every package again
    #[default]
    Clean,
    /// Reuse copies that already exist
    #[serde(other)]
    Keep,
}

#[derive(Debug, Clone)]
pub struct PackageCache {
    root: PathBuf,
}

impl PackageCache {
    /// Open an existing cache directory.
    pub fn open(root: impl Into<PathBuf>) -> PackageResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(PackageError::CacheNotFound(root.display().to_string()));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Versions of `name` present in the cache, in directory listing order.
    pub fn available_versions(&self, name: &str) -> PackageResult<Vec<String>> {
        let prefix = format!("{}#", name);
        let mut versions = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(version) = entry
                .file_name()
                .to_str()
                .and_then(|n| n.strip_prefix(&prefix))
            {
                versions.push(version.to_string());
            }
        }
        Ok(versions)
    }

    /// Find the cache directory for `name#version`.
    ///
    /// Falls back to the best available version when the exact one is absent
    /// (aliases such as `current`/`dev`, patch ranges, then the most recent milestone).
    pub fn locate(&self, name: &str, version: &str) -> PackageResult<PathBuf> {
        if !is_version_alias(version) {
            validate_version_format(version)?;
        }

        let exact = self.root.join(format!("{}#{}", name, version));
        if exact.is_dir() {
            return Ok(exact);
        }

        let available = self.available_versions(name)?;
        let selected = select_version(&available, Some(version))
            .or_else(|| select_version(&available, None))
            .ok_or_else(|| PackageError::PackageNotFound {
                name: name.to_string(),
                version: version.to_string(),
            })?;

        warn!(
            package = %format!("{}#{}", name, version),
            using = %selected,
            available = ?available,
            "Package not found in cache, using another cached version instead"
        );
        Ok(self.root.join(format!("{}#{}", name, selected)))
    }

    /// Load `name#version` directly from the cache.
    pub fn load_package(&self, name: &str, version: &str) -> PackageResult<FhirPackage> {
        let dir = self.locate(name, version)?;
        let package = FhirPackage::from_cache_entry(&dir)?;
        if package.manifest.name != name {
            warn!(
                requested = %name,
                found = %package.manifest.name,
                "Package manifest name differs from the requested package"
            );
        }
        Ok(package)
    }

    /// Copy `name#version` into `work_dir` and return the copy's directory.
    ///
    /// An existing copy is reused as is.
    pub fn stage(&self, name: &str, version: &str, work_dir: &Path) -> PackageResult<PathBuf> {
        let source = self.locate(name, version)?;
        let target = work_dir.join(format!("{}#{}", name, version));

        if target.exists() {
            info!(package = %target.display(), "Skipping existing local package copy");
            return Ok(target);
        }

        copy_dir_all(&source, &target)?;
        info!(
            from = %source.display(),
            to = %target.display(),
            "Copied package from FHIR cache"
        );
        Ok(target)
    }
}

/// Prepare the staging directory for a run according to `mode`.
pub fn prepare_work_dir(work_dir: &Path, mode: StageMode) -> PackageResult<()> {
    if mode == StageMode::Clean && work_dir.exists() {
        info!(dir = %work_dir.display(), "Removing local package copies");
        fs::remove_dir_all(work_dir)?;
    }
    fs::create_dir_all(work_dir)?;
    Ok(())
}

impl FhirPackage {
    /// Load a package from a cache entry directory (`<name>#<version>`).
    ///
    /// Accepts both the usual `package/` sub-folder layout and a flat layout.
    pub fn from_cache_entry(dir: &Path) -> PackageResult<Self> {
        let nested = dir.join("package");
        let package_dir = if nested.join("package.json").exists() {
            nested
        } else {
            dir.to_path_buf()
        };
        let package = Self::from_directory(&package_dir)?;
        debug!(
            package = %package.manifest.package_id(),
            dir = %package.dir.display(),
            resources = package.resources.len(),
            "Loaded package"
        );
        Ok(package)
    }
}

fn copy_dir_all(source: &Path, target: &Path) -> std::io::Result<()> {
    fs::create_dir_all(target)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let destination = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &destination)?;
        } else {
            fs::copy(entry.path(), destination)?;
        }
    }
    Ok(())
}
