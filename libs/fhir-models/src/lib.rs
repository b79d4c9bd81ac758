//! FHIR data models
//!
//! Serde structures for the parts of FHIR conformance and instance resources
//! that ms-find reads.
//!
//! Fields outside the modelled subset are kept in an `other` map, so nothing
//! is lost when a model is built from a `serde_json::Value`.
//!
//! ```rust
//! use msfind_models::common::StructureDefinition;
//! use serde_json::json;
//!
//! let sd_json = json!({
//!     "resourceType": "StructureDefinition",
//!     "url": "http://hl7.org/fhir/us/core/StructureDefinition/us-core-patient",
//!     "name": "USCorePatientProfile",
//!     "title": "US Core Patient Profile",
//!     "type": "Patient"
//! });
//!
//! let sd = StructureDefinition::from_value(&sd_json).unwrap();
//! assert_eq!(sd.display_title(), "US Core Patient Profile");
//! assert_eq!(sd.type_, "Patient");
//! ```

pub mod common;

pub use common::*;
