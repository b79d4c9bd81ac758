//! Bundle model
//!
//! Instance documents are read as Bundles; only `type` and `entry[].resource` matter here.
//! Works for R4, R4B and R5 content.

use super::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub bundle_type: Option<BundleType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<Vec<BundleEntry>>,

    /// Unmodelled fields (meta, total, link, ...)
    #[serde(flatten)]
    pub other: HashMap<String, Value>,
}

/// Bundle.type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BundleType {
    Document,
    Message,
    Transaction,
    TransactionResponse,
    Batch,
    BatchResponse,
    History,
    Searchset,
    Collection,
    /// R5 only
    SubscriptionNotification,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    /// Entry resource, kept as raw JSON for path walking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,

    /// Unmodelled fields (request, response, search)
    #[serde(flatten)]
    pub other: HashMap<String, Value>,
}

impl Bundle {
    /// Parse from an owned JSON Value, rejecting anything that is not a Bundle
    pub fn from_value(value: Value) -> Result<Self> {
        let bundle: Self = serde_json::from_value(value)?;
        if bundle.resource_type != "Bundle" {
            return Err(Error::UnexpectedResourceType {
                expected: "Bundle",
                found: bundle.resource_type,
            });
        }
        Ok(bundle)
    }

    pub fn entries(&self) -> &[BundleEntry] {
        self.entry.as_deref().unwrap_or(&[])
    }

    pub fn entry_count(&self) -> usize {
        self.entries().len()
    }

    /// Resources carried by the entries, in entry order
    pub fn resources(&self) -> impl Iterator<Item = &Value> {
        self.entries().iter().filter_map(|e| e.resource.as_ref())
    }
}
