//! Version selection for packages found in the local cache
//!
//! Follows the FHIR package version rules:
//! - https://confluence.hl7.org/spaces/FHIR/pages/35718629/NPM+Package+Specification
//! - https://build.fhir.org/ig/FHIR/ig-guidance/versions.html
//!
//! - `current`, `dev`, `cibuild`, `latest` or an empty reference select the most recent milestone
//! - `1.5.x` selects the highest patch of 1.5, `1.2` is read as `1.2.x`
//! - exact versions prefer the unlabeled release over labeled builds (`1.2.3` over `1.2.3-ballot`)

use std::cmp::Ordering;

/// Keywords that name a moving build rather than a published version.
pub const VERSION_ALIASES: &[&str] = &["current", "dev", "cibuild", "latest"];

/// Returns true when `reference` is one of [`VERSION_ALIASES`].
pub fn is_version_alias(reference: &str) -> bool {
    VERSION_ALIASES.contains(&reference)
}

#[derive(Debug, PartialEq, Eq)]
enum VersionRequest<'a> {
    MostRecent,
    PatchRange(&'a str),
    Exact(&'a str),
}

impl<'a> VersionRequest<'a> {
    fn parse(reference: &'a str) -> Self {
        if reference.is_empty() || is_version_alias(reference) {
            return Self::MostRecent;
        }
        if let Some(prefix) = reference.strip_suffix(".x") {
            return Self::PatchRange(prefix);
        }
        let mut parts = reference.split('.');
        let major_minor = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(a), Some(b), None) if a.parse::<u32>().is_ok() && b.parse::<u32>().is_ok()
        );
        if major_minor {
            Self::PatchRange(reference)
        } else {
            Self::Exact(reference)
        }
    }
}

/// Select the best matching version among `available` for `reference`.
///
/// Returns `None` when nothing matches.
pub fn select_version(available: &[String], reference: Option<&str>) -> Option<String> {
    if available.is_empty() {
        return None;
    }

    match VersionRequest::parse(reference.unwrap_or("")) {
        VersionRequest::MostRecent => highest_preferring_unlabeled(available.iter()),
        VersionRequest::PatchRange(prefix) => select_patch_range(available, prefix),
        VersionRequest::Exact(version) => select_exact(available, version),
    }
}

fn is_labeled(version: &str) -> bool {
    version.contains('-')
}

fn highest_preferring_unlabeled<'a>(
    versions: impl Iterator<Item = &'a String> + Clone,
) -> Option<String> {
    versions
        .clone()
        .filter(|v| !is_labeled(v))
        .max_by(|a, b| compare_version_keys(a, b))
        .or_else(|| versions.max_by(|a, b| compare_version_keys(a, b)))
        .cloned()
}

fn select_patch_range(available: &[String], prefix: &str) -> Option<String> {
    let prefix_parts: Vec<u32> = prefix
        .split('.')
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;

    let matching = available.iter().filter(|version| {
        let base = version.split('-').next().unwrap_or(version);
        let parts: Result<Vec<u32>, _> = base.split('.').map(str::parse).collect();
        match parts {
            Ok(parts) => {
                parts.len() == prefix_parts.len() + 1 && parts.starts_with(&prefix_parts)
            }
            Err(_) => false,
        }
    });

    highest_preferring_unlabeled(matching)
}

fn select_exact(available: &[String], requested: &str) -> Option<String> {
    if let Some(exact) = available.iter().find(|v| v.as_str() == requested) {
        return Some(exact.clone());
    }

    // "1.2.3-ballot" requested, "1.2.3" available
    if let Some((base, _label)) = requested.split_once('-') {
        if let Some(unlabeled) = available.iter().find(|v| v.as_str() == base) {
            return Some(unlabeled.clone());
        }
    }

    // "1.2.3" requested, only labeled builds of it available
    let labeled_prefix = format!("{}-", requested);
    available
        .iter()
        .filter(|v| v.starts_with(&labeled_prefix))
        .max_by(|a, b| compare_version_keys(a, b))
        .cloned()
}

/// Total order over version strings: numeric parts numerically, other parts by character.
pub fn compare_version_keys(a: &str, b: &str) -> Ordering {
    version_key(a).cmp(&version_key(b))
}

fn version_key(version: &str) -> Vec<VersionPart> {
    version
        .split('.')
        .flat_map(|part| {
            let numeric = part.split_once('-').map_or(part, |(num, _)| num);
            match numeric.parse::<u32>() {
                Ok(n) => vec![VersionPart::Number(n)],
                Err(_) => numeric.chars().map(VersionPart::Char).collect(),
            }
        })
        .collect()
}

// Numbers sort before characters, so "1.0.0" < "1.0.a".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum VersionPart {
    Number(u32),
    Char(char),
}
