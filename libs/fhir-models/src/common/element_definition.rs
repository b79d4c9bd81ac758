//! ElementDefinition model
//!
//! Entries of `StructureDefinition.differential.element` and `snapshot.element`. The fields that
//! decide mustSupport, cardinality and extension identity are typed; the rest of the element
//! (binding, constraint, fixed and pattern values, ...) stays in `other`.

use super::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinition {
    /// `Patient.extension:race.url` style id, ancestor slices included
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Dotted path without slice names
    pub path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub slice_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,

    /// A number or `*`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<ElementBase>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<TypeRef>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub must_support: Option<bool>,

    #[serde(flatten)]
    pub other: HashMap<String, Value>,
}

/// `ElementDefinition.base`: cardinality of the element in the base resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementBase {
    pub path: String,
    pub min: u32,
    pub max: String,
}

/// `ElementDefinition.type`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypeRef {
    pub code: String,

    /// Profiles the value must conform to; for `Extension` the extension definition url
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_profile: Option<Vec<String>>,
}

impl ElementDefinition {
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(Error::from)
    }

    /// `path:sliceName`, or `path` for unsliced elements
    pub fn key(&self) -> String {
        match &self.slice_name {
            Some(slice) => format!("{}:{}", self.path, slice),
            None => self.path.clone(),
        }
    }

    pub fn is_must_support(&self) -> bool {
        self.must_support == Some(true)
    }

    pub fn type_codes(&self) -> Vec<String> {
        self.types
            .iter()
            .flatten()
            .map(|t| t.code.clone())
            .collect()
    }

    /// First profile declared on an `Extension` type
    pub fn extension_profile(&self) -> Option<&str> {
        self.types
            .iter()
            .flatten()
            .filter(|t| t.code == "Extension")
            .find_map(|t| t.profile.as_ref()?.first())
            .map(String::as_str)
    }

    /// `fixedUri`, set on `Extension.url` elements to pin the url of a slice
    pub fn fixed_uri(&self) -> Option<&str> {
        self.other.get("fixedUri").and_then(Value::as_str)
    }
}
