//! Resolved mustSupport element descriptor

use crate::cardinality::Cardinality;
use crate::path::ElementPath;

/// One mustSupport element of one profile.
///
/// Built once by the resolver and only read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MustSupportElement {
    /// Resource type the profile constrains (`Patient`, `Observation`, ...)
    pub resource_type: String,
    /// Human readable profile title
    pub profile_title: String,
    /// Canonical url of the profile
    pub profile_url: String,
    pub path: ElementPath,
    pub cardinality: Cardinality,
    /// Canonical url of the extension, for extension elements
    pub extension_url: Option<String>,
    /// ElementDefinition.short
    pub short: Option<String>,
}

impl MustSupportElement {
    /// Display form of the path, as written to the report
    pub fn element(&self) -> String {
        self.path.render()
    }
}
