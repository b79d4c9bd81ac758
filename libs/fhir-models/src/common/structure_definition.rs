//! FHIR StructureDefinition header
//!
//! The descriptive part of a StructureDefinition. The element lists stay as raw JSON so that a
//! single malformed element does not make the whole profile unreadable.

use super::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Descriptive fields of a FHIR StructureDefinition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StructureDefinition {
    /// Resource type - always "StructureDefinition"
    pub resource_type: String,

    /// Logical id of this artifact
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Canonical identifier for this structure definition
    #[serde(default)]
    pub url: String,

    /// Business version of the structure definition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Computer friendly name
    #[serde(default)]
    pub name: Option<String>,

    /// Human friendly name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Type defined or constrained by this structure
    #[serde(rename = "type", default)]
    pub type_: String,

    /// specialization | constraint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivation: Option<String>,
}

impl StructureDefinition {
    /// Parse from JSON Value
    pub fn from_value(value: &Value) -> Result<Self> {
        let sd: Self = serde_json::from_value(value.clone())?;
        if sd.resource_type != "StructureDefinition" {
            return Err(Error::UnexpectedResourceType {
                expected: "StructureDefinition",
                found: sd.resource_type,
            });
        }
        Ok(sd)
    }

    /// Title for reports: `title`, else `name`, else "Unknown"
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("Unknown")
    }

    /// Canonical reference including the version when present (`url|version`)
    pub fn canonical(&self) -> String {
        match &self.version {
            Some(version) => format!("{}|{}", self.url, version),
            None => self.url.clone(),
        }
    }
}

/// Raw `differential.element` array of a StructureDefinition
pub fn differential_elements(sd: &Value) -> Option<&[Value]> {
    sd.pointer("/differential/element")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
}

/// Raw `snapshot.element` array of a StructureDefinition
pub fn snapshot_elements(sd: &Value) -> Option<&[Value]> {
    sd.pointer("/snapshot/element")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
}
