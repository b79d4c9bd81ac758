//! Usage aggregation across instance documents

use crate::cardinality::Cardinality;
use crate::diagnostics::Diagnostics;
use crate::element::MustSupportElement;
use crate::walker::count_usage;
use msfind_models::common::Bundle;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// How a document's occurrences of an element are added to its usage count
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountPolicy {
    /// Per occurrence for unbounded (`*`) elements, per document otherwise
    #[default]
    Cardinality,
    /// +1 for each document holding at least one populated value
    Document,
    /// Every populated occurrence
    Occurrence,
}

impl CountPolicy {
    /// Contribution of one document with `occurrences` populated values
    pub fn increment(self, cardinality: &Cardinality, occurrences: u64) -> u64 {
        let per_occurrence = match self {
            CountPolicy::Cardinality => cardinality.is_unbounded(),
            CountPolicy::Document => false,
            CountPolicy::Occurrence => true,
        };
        if per_occurrence {
            occurrences
        } else {
            u64::from(occurrences > 0)
        }
    }
}

impl fmt::Display for CountPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CountPolicy::Cardinality => "cardinality",
            CountPolicy::Document => "document",
            CountPolicy::Occurrence => "occurrence",
        })
    }
}

/// One instance document (a Bundle read from the instances directory)
#[derive(Debug, Clone)]
pub struct InstanceDocument {
    /// File name, used in logs
    pub name: String,
    pub bundle: Bundle,
}

impl InstanceDocument {
    pub fn new(name: impl Into<String>, bundle: Bundle) -> Self {
        Self {
            name: name.into(),
            bundle,
        }
    }

    /// Resources of the document's entries
    pub fn resources(&self) -> impl Iterator<Item = &Value> {
        self.bundle.resources()
    }
}

/// Per-element usage accumulator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageCount(u64);

impl UsageCount {
    pub fn add(&mut self, n: u64) {
        self.0 = self.0.saturating_add(n);
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// One line of the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub resource_type: String,
    pub profile_title: String,
    pub element: String,
    pub cardinality: String,
    /// `None` when no instance documents were analyzed
    pub use_count: Option<u64>,
}

impl ReportRow {
    fn new(element: &MustSupportElement, use_count: Option<u64>) -> Self {
        Self {
            resource_type: element.resource_type.clone(),
            profile_title: element.profile_title.clone(),
            element: element.element(),
            cardinality: element.cardinality.to_string(),
            use_count,
        }
    }
}

/// Combine resolved elements with instance usage into report rows, in element order.
pub fn aggregate(
    elements: &[MustSupportElement],
    documents: &[InstanceDocument],
    policy: CountPolicy,
    diagnostics: &mut Diagnostics,
) -> Vec<ReportRow> {
    if documents.is_empty() {
        return elements.iter().map(|e| ReportRow::new(e, None)).collect();
    }

    let mut counts = vec![UsageCount::default(); elements.len()];

    for document in documents {
        debug!(document = %document.name, resources = document.bundle.entry_count(), "Walking instance document");
        for (element, count) in elements.iter().zip(counts.iter_mut()) {
            let occurrences: u64 = document
                .resources()
                .filter(|r| {
                    r.get("resourceType").and_then(Value::as_str)
                        == Some(element.resource_type.as_str())
                })
                .map(|r| count_usage(element, r, diagnostics))
                .sum();
            count.add(policy.increment(&element.cardinality, occurrences));
        }
    }

    elements
        .iter()
        .zip(counts)
        .map(|(element, count)| ReportRow::new(element, Some(count.get())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cardinality::Max;
    use crate::path::ElementPath;
    use serde_json::json;

    fn element(path: &str, max: Max) -> MustSupportElement {
        MustSupportElement {
            resource_type: "Patient".to_string(),
            profile_title: "Test Patient".to_string(),
            profile_url: "http://example.org/StructureDefinition/patient".to_string(),
            path: ElementPath::parse(path),
            cardinality: Cardinality::new(0, max).unwrap(),
            extension_url: None,
            short: None,
        }
    }

    fn document(name: &str, resources: Vec<Value>) -> InstanceDocument {
        let entries: Vec<Value> = resources.into_iter().map(|r| json!({ "resource": r })).collect();
        let bundle = Bundle::from_value(json!({
            "resourceType": "Bundle",
            "type": "collection",
            "entry": entries
        }))
        .unwrap();
        InstanceDocument::new(name, bundle)
    }

    #[test]
    fn test_policy_increment() {
        let bounded = Cardinality::DEFAULT;
        let unbounded = Cardinality::parse(0, "*").unwrap();

        assert_eq!(CountPolicy::Cardinality.increment(&bounded, 3), 1);
        assert_eq!(CountPolicy::Cardinality.increment(&unbounded, 3), 3);
        assert_eq!(CountPolicy::Document.increment(&unbounded, 3), 1);
        assert_eq!(CountPolicy::Occurrence.increment(&bounded, 3), 3);
        assert_eq!(CountPolicy::Document.increment(&bounded, 0), 0);
    }

    #[test]
    fn test_policy_serde() {
        let policy: CountPolicy = serde_json::from_value(json!("occurrence")).unwrap();
        assert_eq!(policy, CountPolicy::Occurrence);
        assert_eq!(CountPolicy::default().to_string(), "cardinality");
        assert!(serde_json::from_value::<CountPolicy>(json!("sometimes")).is_err());
    }

    #[test]
    fn test_no_documents_leaves_counts_blank() {
        let elements = vec![element("Patient.birthDate", Max::Bounded(1))];
        let rows = aggregate(&elements, &[], CountPolicy::default(), &mut Diagnostics::new());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].use_count, None);
        assert_eq!(rows[0].cardinality, "0..1");
    }

    #[test]
    fn test_per_document_counting() {
        let elements = vec![
            element("Patient.birthDate", Max::Bounded(1)),
            element("Patient.name", Max::Unbounded),
        ];
        let documents = vec![
            document(
                "a.json",
                vec![json!({
                    "resourceType": "Patient",
                    "birthDate": "1970-01-01",
                    "name": [{ "family": "Lee" }, { "family": "Li" }]
                })],
            ),
            document(
                "b.json",
                vec![
                    json!({ "resourceType": "Patient", "name": [{ "family": "Smith" }] }),
                    json!({ "resourceType": "Observation", "birthDate": "1970-01-01" }),
                ],
            ),
        ];

        let rows = aggregate(&elements, &documents, CountPolicy::Cardinality, &mut Diagnostics::new());
        assert_eq!(rows[0].element, "Patient.birthDate");
        assert_eq!(rows[0].use_count, Some(1));
        assert_eq!(rows[1].use_count, Some(3));

        let rows = aggregate(&elements, &documents, CountPolicy::Document, &mut Diagnostics::new());
        assert_eq!(rows[1].use_count, Some(2));
    }

    #[test]
    fn test_multiple_resources_in_one_document_count_once_when_bounded() {
        let elements = vec![element("Patient.gender", Max::Bounded(1))];
        let documents = vec![document(
            "patients.json",
            vec![
                json!({ "resourceType": "Patient", "gender": "female" }),
                json!({ "resourceType": "Patient", "gender": "male" }),
            ],
        )];

        let rows = aggregate(&elements, &documents, CountPolicy::default(), &mut Diagnostics::new());
        assert_eq!(rows[0].use_count, Some(1));

        let rows = aggregate(&elements, &documents, CountPolicy::Occurrence, &mut Diagnostics::new());
        assert_eq!(rows[0].use_count, Some(2));
    }
}
