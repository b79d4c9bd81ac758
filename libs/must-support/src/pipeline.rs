//! End-to-end run: stage packages, resolve profiles, count usage, write the report.

use crate::aggregate::{aggregate, ReportRow};
use crate::config::{Config, PackageSpec};
use crate::diagnostics::Diagnostics;
use crate::element::MustSupportElement;
use crate::error::{Error, Result, Warning};
use crate::instances::load_instances;
use crate::report::write_report;
use crate::resolver::resolve;
use msfind_models::common::StructureDefinition;
use msfind_package::{prepare_work_dir, FhirPackage, PackageCache, PackageError};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::info;

/// Directory layout and overrides of one run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Root data folder; `packages/` and `reports/` are created below it
    pub rootdir: PathBuf,
    /// Instance directory, overriding the configured one
    pub instances: Option<PathBuf>,
}

impl RunOptions {
    pub fn new(rootdir: impl Into<PathBuf>) -> Self {
        Self {
            rootdir: rootdir.into(),
            instances: None,
        }
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.rootdir.join("packages")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.rootdir.join("reports")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.rootdir.join("logs")
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub report_path: PathBuf,
    pub packages_loaded: usize,
    pub profiles: usize,
    pub documents: usize,
    pub rows: Vec<ReportRow>,
}

/// Run the whole analysis.
///
/// Only configuration and output failures are errors; everything else is recorded in
/// `diagnostics` and the report covers what could be resolved.
pub fn run(config: &Config, options: &RunOptions, diagnostics: &mut Diagnostics) -> Result<RunSummary> {
    let cache = PackageCache::open(&config.fhir_package_cache).map_err(|e| match e {
        PackageError::CacheNotFound(_) => Error::PackageCacheMissing(config.fhir_package_cache.clone()),
        other => Error::Package(other),
    })?;

    let work_dir = options.packages_dir();
    let mode = config.mode();
    info!(mode = ?mode, dir = %work_dir.display(), "Preparing package directory");
    prepare_work_dir(&work_dir, mode)?;

    let mut packages_loaded = 0;
    let mut profiles = 0;
    let mut seen_profiles = HashSet::new();
    let mut elements: Vec<MustSupportElement> = Vec::new();

    for spec in &config.packages {
        let package = match stage_and_load(&cache, spec, &work_dir) {
            Ok(package) => package,
            Err(e) => {
                diagnostics.push(Warning::PackageLoad {
                    name: spec.name.clone(),
                    version: spec.version.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        packages_loaded += 1;
        info!(package = %spec.display_title(), resources = package.resources.len(), "Processing package");

        for sd in package.resources_of_type("StructureDefinition") {
            let header = match StructureDefinition::from_value(sd) {
                Ok(header) => header,
                Err(e) => {
                    diagnostics.push(Warning::ProfileResolution {
                        profile: sd.get("id").and_then(|v| v.as_str()).unwrap_or("<no id>").to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let canonical = header.canonical();
            if !header.url.is_empty() && !seen_profiles.insert(canonical.clone()) {
                diagnostics.push(Warning::ProfileResolution {
                    profile: header.display_title().to_string(),
                    reason: format!("{} already loaded from an earlier package", canonical),
                });
                continue;
            }

            profiles += 1;
            elements.extend(resolve(sd, header.display_title(), diagnostics));
        }
    }

    let instances_dir = options
        .instances
        .clone()
        .unwrap_or_else(|| config.instances_dir());
    let documents = load_instances(&instances_dir, diagnostics);

    let rows = aggregate(&elements, &documents, config.count_policy, diagnostics);
    let report_path = write_report(&rows, &options.reports_dir())?;

    info!(
        packages = packages_loaded,
        profiles,
        elements = elements.len(),
        documents = documents.len(),
        warnings = diagnostics.len(),
        "Run complete"
    );

    Ok(RunSummary {
        report_path,
        packages_loaded,
        profiles,
        documents: documents.len(),
        rows,
    })
}

fn stage_and_load(
    cache: &PackageCache,
    spec: &PackageSpec,
    work_dir: &std::path::Path,
) -> std::result::Result<FhirPackage, PackageError> {
    let staged = cache.stage(&spec.name, &spec.version, work_dir)?;
    FhirPackage::from_cache_entry(&staged)
}
