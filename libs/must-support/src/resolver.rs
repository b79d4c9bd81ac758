//! Profile resolution
//!
//! Turns a StructureDefinition into the ordered list of its mustSupport elements.
//!
//! - Elements come from the differential, in differential order. A profile without a
//!   differential falls back to its snapshot.
//! - Cardinality is taken field by field from the differential element, then the snapshot
//!   element with the same id (or `path:sliceName`), then the element's `base`.
//! - Extension slices keep their slice name for display; their canonical url comes from
//!   `type.profile`, or from a `fixedUri` on the slice's `url` child element.
//! - Malformed elements and duplicates are skipped with a warning.

use crate::cardinality::{Cardinality, CardinalityError};
use crate::diagnostics::Diagnostics;
use crate::element::MustSupportElement;
use crate::error::Warning;
use crate::path::{type_suffix, ElementPath};
use msfind_models::common::{differential_elements, snapshot_elements, ElementDefinition};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Element list indexed by element id and by `path[:sliceName]`
#[derive(Debug, Default)]
struct ElementTable {
    elements: Vec<ElementDefinition>,
    by_id: HashMap<String, usize>,
    by_key: HashMap<String, usize>,
}

impl ElementTable {
    /// Index every element that deserializes; the rest only matter if flagged mustSupport,
    /// which the caller reports separately.
    fn new(raw: Option<&[Value]>) -> Self {
        let mut table = Self::default();
        for value in raw.unwrap_or_default() {
            let Ok(element) = ElementDefinition::from_value(value) else {
                continue;
            };
            let position = table.elements.len();
            if let Some(id) = &element.id {
                table.by_id.entry(id.clone()).or_insert(position);
            }
            table.by_key.entry(element.key()).or_insert(position);
            table.elements.push(element);
        }
        table
    }

    fn find(&self, id: Option<&str>, key: &str) -> Option<&ElementDefinition> {
        id.and_then(|id| self.by_id.get(id))
            .or_else(|| self.by_key.get(key))
            .map(|&i| &self.elements[i])
    }

    fn find_id(&self, id: &str) -> Option<&ElementDefinition> {
        self.by_id.get(id).map(|&i| &self.elements[i])
    }
}

/// `path[:sliceName]` lookup key of a path: segment names plus the last segment's slice
fn lookup_key(path: &ElementPath) -> String {
    let names: Vec<&str> = path.segments().iter().map(|s| s.name()).collect();
    let mut key = names.join(".");
    if let Some(slice) = path.last().and_then(|s| s.slice_name()) {
        key.push(':');
        key.push_str(slice);
    }
    key
}

struct ProfileContext<'a> {
    resource_type: &'a str,
    profile_title: &'a str,
    profile_url: &'a str,
    differential: ElementTable,
    snapshot: ElementTable,
}

impl ProfileContext<'_> {
    /// Definitions of the element at `path`: differential first, then snapshot
    fn definitions(&self, path: &ElementPath) -> impl Iterator<Item = &ElementDefinition> {
        let id = path.render();
        let key = lookup_key(path);
        [
            self.differential.find(Some(id.as_str()), &key),
            self.snapshot.find(Some(id.as_str()), &key),
        ]
        .into_iter()
        .flatten()
    }

    /// Canonical url of the extension selected by `path`
    fn extension_url(&self, path: &ElementPath) -> Option<String> {
        if let Some(profile) = self
            .definitions(path)
            .find_map(ElementDefinition::extension_profile)
        {
            return Some(profile.to_string());
        }

        // Slices of complex extensions pin their url on the `url` child.
        path.last().and_then(|s| s.slice_name())?;
        let url_id = format!("{}.url", path.render());
        [
            self.differential.find_id(&url_id),
            self.snapshot.find_id(&url_id),
        ]
        .into_iter()
        .flatten()
        .find_map(ElementDefinition::fixed_uri)
        .map(str::to_string)
    }

    fn choice_types(&self, path: &ElementPath) -> Vec<String> {
        let codes = self
            .definitions(path)
            .map(ElementDefinition::type_codes)
            .find(|codes| !codes.is_empty())
            .unwrap_or_default();

        let mut suffixes: Vec<String> = Vec::with_capacity(codes.len());
        for suffix in codes.iter().map(|c| type_suffix(c)) {
            if !suffix.is_empty() && !suffixes.contains(&suffix) {
                suffixes.push(suffix);
            }
        }
        suffixes
    }

    fn cardinality(&self, element: &ElementDefinition) -> Result<Cardinality, CardinalityError> {
        let snapshot = self
            .snapshot
            .find(element.id.as_deref(), &element.key());
        let base = element
            .base
            .as_ref()
            .or_else(|| snapshot.and_then(|s| s.base.as_ref()));

        let min = element
            .min
            .or_else(|| snapshot.and_then(|s| s.min))
            .or_else(|| base.map(|b| b.min));
        let max = element
            .max
            .as_deref()
            .or_else(|| snapshot.and_then(|s| s.max.as_deref()))
            .or_else(|| base.map(|b| b.max.as_str()));

        match (min, max) {
            (None, None) => {
                debug!(element = %element.key(), "No cardinality declared, using default");
                Ok(Cardinality::DEFAULT)
            }
            (min, max) => Cardinality::parse(min.unwrap_or(0), max.unwrap_or("1")),
        }
    }

    fn resolve_element(&self, element: &ElementDefinition) -> Result<MustSupportElement, String> {
        let cardinality = self
            .cardinality(element)
            .map_err(|e| format!("element {} skipped: {}", element.key(), e))?;

        let mut path = element_path(element);
        for i in 0..path.len() {
            let prefix = path.prefix(i + 1);
            let segment = &path.segments()[i];
            let is_extension = segment.is_extension();
            let is_choice = segment.is_choice();

            if is_extension {
                if let Some(url) = self.extension_url(&prefix) {
                    path.segments_mut()[i].set_url(url);
                }
            }
            if is_choice {
                let types = self.choice_types(&prefix);
                path.segments_mut()[i].set_choice_types(types);
            }
        }

        let extension_url = path
            .last()
            .filter(|s| s.is_extension())
            .and_then(|s| s.url())
            .map(str::to_string);

        let short = element.short.clone().or_else(|| {
            self.snapshot
                .find(element.id.as_deref(), &element.key())
                .and_then(|s| s.short.clone())
        });

        Ok(MustSupportElement {
            resource_type: self.resource_type.to_string(),
            profile_title: self.profile_title.to_string(),
            profile_url: self.profile_url.to_string(),
            path,
            cardinality,
            extension_url,
            short,
        })
    }
}

/// Path of an element, taken from its id when the id agrees with `path` and `sliceName`
/// (the id also carries the slices of ancestor elements).
fn element_path(element: &ElementDefinition) -> ElementPath {
    let from_path = ElementPath::parse_differential(&element.path, element.slice_name.as_deref());
    if let Some(id) = &element.id {
        let from_id = ElementPath::parse(id);
        let same_slice = from_id.last().and_then(|s| s.slice_name())
            == from_path.last().and_then(|s| s.slice_name());
        if same_slice && from_id.same_names(&from_path) {
            return from_id;
        }
    }
    from_path
}

fn str_field<'a>(value: &'a Value, name: &str) -> &'a str {
    value.get(name).and_then(Value::as_str).unwrap_or_default()
}

/// Resolve the mustSupport elements of one StructureDefinition.
///
/// Never fails: problems are recorded in `diagnostics` and the affected element (or the
/// whole profile) is left out.
pub fn resolve(
    structure_definition: &Value,
    profile_title: &str,
    diagnostics: &mut Diagnostics,
) -> Vec<MustSupportElement> {
    let differential = differential_elements(structure_definition);
    let snapshot = snapshot_elements(structure_definition);

    let source = match (differential, snapshot) {
        (Some(elements), _) => elements,
        (None, Some(elements)) => {
            diagnostics.push(Warning::ProfileResolution {
                profile: profile_title.to_string(),
                reason: "no differential, using snapshot elements".to_string(),
            });
            elements
        }
        (None, None) => {
            diagnostics.push(Warning::ProfileResolution {
                profile: profile_title.to_string(),
                reason: "no differential or snapshot elements".to_string(),
            });
            return Vec::new();
        }
    };

    let context = ProfileContext {
        resource_type: match str_field(structure_definition, "type") {
            "" => "Unknown",
            t => t,
        },
        profile_title,
        profile_url: str_field(structure_definition, "url"),
        differential: ElementTable::new(differential),
        snapshot: ElementTable::new(snapshot),
    };

    let mut resolved = Vec::new();
    let mut seen: HashSet<(ElementPath, Option<String>)> = HashSet::new();

    for raw in source {
        if raw.get("mustSupport").and_then(Value::as_bool) != Some(true) {
            continue;
        }

        let outcome = ElementDefinition::from_value(raw)
            .map_err(|e| {
                let path = raw.get("path").and_then(Value::as_str).unwrap_or("<no path>");
                format!("element {} skipped: {}", path, e)
            })
            .and_then(|element| context.resolve_element(&element));

        let element = match outcome {
            Ok(element) => element,
            Err(reason) => {
                diagnostics.push(Warning::ProfileResolution {
                    profile: profile_title.to_string(),
                    reason,
                });
                continue;
            }
        };

        if !seen.insert((element.path.clone(), element.extension_url.clone())) {
            diagnostics.push(Warning::ProfileResolution {
                profile: profile_title.to_string(),
                reason: format!("duplicate mustSupport element {} ignored", element.path),
            });
            continue;
        }

        debug!(
            profile = %profile_title,
            element = %element.path,
            cardinality = %element.cardinality,
            "Resolved mustSupport element"
        );
        resolved.push(element);
    }

    if !resolved.is_empty() {
        info!(
            profile = %profile_title,
            count = resolved.len(),
            "Found mustSupport elements"
        );
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cardinality::Max;
    use serde_json::json;

    fn profile(differential: Value, snapshot: Value) -> Value {
        json!({
            "resourceType": "StructureDefinition",
            "url": "http://example.org/StructureDefinition/test",
            "name": "TestProfile",
            "title": "Test Profile",
            "type": "ServiceRequest",
            "differential": { "element": differential },
            "snapshot": { "element": snapshot }
        })
    }

    #[test]
    fn test_slice_name_wins_over_profile_url() {
        let sd = profile(
            json!([{
                "id": "ServiceRequest.extension:statusReason",
                "path": "ServiceRequest.extension",
                "sliceName": "statusReason",
                "min": 0,
                "max": "1",
                "type": [{
                    "code": "Extension",
                    "profile": ["http://example.org/StructureDefinition/status-reason"]
                }],
                "mustSupport": true
            }]),
            json!([]),
        );

        let mut diagnostics = Diagnostics::new();
        let elements = resolve(&sd, "Test Profile", &mut diagnostics);

        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].element(), "ServiceRequest.extension:statusReason");
        assert_eq!(
            elements[0].extension_url.as_deref(),
            Some("http://example.org/StructureDefinition/status-reason")
        );
        assert_eq!(elements[0].resource_type, "ServiceRequest");
        assert_eq!(elements[0].profile_url, "http://example.org/StructureDefinition/test");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_url_only_extension_keeps_bare_display() {
        let sd = profile(
            json!([{
                "path": "ServiceRequest.extension",
                "type": [{
                    "code": "Extension",
                    "profile": ["http://example.org/StructureDefinition/ordered-by"]
                }],
                "mustSupport": true
            }]),
            json!([]),
        );

        let elements = resolve(&sd, "Test Profile", &mut Diagnostics::new());
        assert_eq!(elements[0].element(), "ServiceRequest.extension");
        assert_eq!(
            elements[0].extension_url.as_deref(),
            Some("http://example.org/StructureDefinition/ordered-by")
        );
    }

    #[test]
    fn test_cardinality_falls_back_to_snapshot() {
        let sd = profile(
            json!([
                { "id": "ServiceRequest.code", "path": "ServiceRequest.code", "min": 1, "mustSupport": true },
                { "id": "ServiceRequest.note", "path": "ServiceRequest.note", "mustSupport": true },
                { "id": "ServiceRequest.reason", "path": "ServiceRequest.reason", "mustSupport": true,
                  "base": { "path": "ServiceRequest.reason", "min": 0, "max": "*" } },
                { "id": "ServiceRequest.status", "path": "ServiceRequest.status", "min": 1, "max": "1", "mustSupport": true }
            ]),
            json!([
                { "id": "ServiceRequest.code", "path": "ServiceRequest.code", "min": 0, "max": "1" },
                { "id": "ServiceRequest.note", "path": "ServiceRequest.note", "min": 0, "max": "*" },
                { "id": "ServiceRequest.status", "path": "ServiceRequest.status", "min": 0, "max": "1" }
            ]),
        );

        let elements = resolve(&sd, "Test Profile", &mut Diagnostics::new());
        let rendered: Vec<(String, String)> = elements
            .iter()
            .map(|e| (e.element(), e.cardinality.to_string()))
            .collect();
        assert_eq!(
            rendered,
            vec![
                ("ServiceRequest.code".to_string(), "1..1".to_string()),
                ("ServiceRequest.note".to_string(), "0..*".to_string()),
                ("ServiceRequest.reason".to_string(), "0..*".to_string()),
                ("ServiceRequest.status".to_string(), "1..1".to_string()),
            ]
        );
    }

    #[test]
    fn test_must_support_is_not_inherited_across_slices() {
        let sd = profile(
            json!([
                { "id": "ServiceRequest.extension:a", "path": "ServiceRequest.extension", "sliceName": "a", "mustSupport": true },
                { "id": "ServiceRequest.extension:b", "path": "ServiceRequest.extension", "sliceName": "b" }
            ]),
            json!([
                { "id": "ServiceRequest.extension:b", "path": "ServiceRequest.extension", "sliceName": "b", "mustSupport": true }
            ]),
        );

        let elements = resolve(&sd, "Test Profile", &mut Diagnostics::new());
        let paths: Vec<String> = elements.iter().map(MustSupportElement::element).collect();
        assert_eq!(paths, vec!["ServiceRequest.extension:a".to_string()]);
        assert_eq!(elements[0].cardinality, Cardinality::DEFAULT);
    }

    #[test]
    fn test_malformed_cardinality_is_skipped() {
        let sd = profile(
            json!([
                { "path": "ServiceRequest.code", "min": "one", "mustSupport": true },
                { "path": "ServiceRequest.note", "min": 2, "max": "1", "mustSupport": true },
                { "path": "ServiceRequest.status", "min": 0, "max": "lots", "mustSupport": true },
                { "path": "ServiceRequest.subject", "min": 1, "max": "1", "mustSupport": true }
            ]),
            json!([]),
        );

        let mut diagnostics = Diagnostics::new();
        let elements = resolve(&sd, "Test Profile", &mut diagnostics);

        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].element(), "ServiceRequest.subject");
        assert_eq!(diagnostics.len(), 3);
        assert!(diagnostics
            .warnings()
            .iter()
            .all(|w| matches!(w, Warning::ProfileResolution { .. })));
    }

    #[test]
    fn test_duplicates_are_ignored() {
        let sd = profile(
            json!([
                { "path": "ServiceRequest.code", "min": 1, "max": "1", "mustSupport": true },
                { "path": "ServiceRequest.code", "min": 0, "max": "1", "mustSupport": true }
            ]),
            json!([]),
        );

        let mut diagnostics = Diagnostics::new();
        let elements = resolve(&sd, "Test Profile", &mut diagnostics);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].cardinality.to_string(), "1..1");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_profile_without_must_support_yields_nothing() {
        let sd = profile(
            json!([{ "path": "ServiceRequest.code", "min": 1 }]),
            json!([{ "path": "ServiceRequest.code", "min": 1, "max": "1" }]),
        );
        let mut diagnostics = Diagnostics::new();
        assert!(resolve(&sd, "Test Profile", &mut diagnostics).is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_missing_sections() {
        let snapshot_only = json!({
            "resourceType": "StructureDefinition",
            "type": "Patient",
            "snapshot": { "element": [
                { "path": "Patient.name", "min": 0, "max": "*", "mustSupport": true }
            ] }
        });
        let mut diagnostics = Diagnostics::new();
        let elements = resolve(&snapshot_only, "Snapshot Only", &mut diagnostics);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].cardinality.max(), Max::Unbounded);
        assert_eq!(diagnostics.len(), 1);

        let empty = json!({ "resourceType": "StructureDefinition", "type": "Patient" });
        let mut diagnostics = Diagnostics::new();
        assert!(resolve(&empty, "Empty", &mut diagnostics).is_empty());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_nested_extension_urls_and_choice_types() {
        let sd = json!({
            "resourceType": "StructureDefinition",
            "url": "http://example.org/StructureDefinition/patient",
            "type": "Patient",
            "differential": { "element": [
                {
                    "id": "Patient.extension:race",
                    "path": "Patient.extension",
                    "sliceName": "race",
                    "type": [{ "code": "Extension", "profile": ["http://example.org/StructureDefinition/race"] }]
                },
                {
                    "id": "Patient.extension:race.extension:ombCategory",
                    "path": "Patient.extension.extension",
                    "sliceName": "ombCategory",
                    "min": 0,
                    "max": "5",
                    "mustSupport": true
                },
                {
                    "id": "Patient.extension:race.extension:ombCategory.url",
                    "path": "Patient.extension.extension.url",
                    "fixedUri": "ombCategory"
                },
                {
                    "id": "Patient.extension:race.extension:ombCategory.value[x]",
                    "path": "Patient.extension.extension.value[x]",
                    "min": 1,
                    "max": "1",
                    "type": [{ "code": "Coding" }],
                    "mustSupport": true
                }
            ] }
        });

        let elements = resolve(&sd, "Patient", &mut Diagnostics::new());
        assert_eq!(elements.len(), 2);

        let category = &elements[0];
        assert_eq!(category.element(), "Patient.extension:race.extension:ombCategory");
        assert_eq!(category.extension_url.as_deref(), Some("ombCategory"));
        assert_eq!(
            category.path.segments()[1].url(),
            Some("http://example.org/StructureDefinition/race")
        );

        let value = &elements[1];
        assert_eq!(value.element(), "Patient.extension:race.extension:ombCategory.value[x]");
        assert_eq!(value.extension_url, None);
        assert_eq!(value.path.segments()[3].choice_types(), ["Coding".to_string()]);
    }
}
