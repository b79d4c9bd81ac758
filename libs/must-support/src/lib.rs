//! mustSupport element resolution and usage counting
//!
//! Given FHIR Implementation Guide packages from the local package cache, this crate finds every
//! element a profile flags `mustSupport`, counts how often each one is populated in a set of
//! instance Bundles and writes the result as a tab separated report.
//!
//! ```
//! use msfind_core::{resolve, Diagnostics};
//! use serde_json::json;
//!
//! let profile = json!({
//!     "resourceType": "StructureDefinition",
//!     "type": "Patient",
//!     "title": "Example Patient",
//!     "differential": { "element": [
//!         { "path": "Patient.name", "min": 1, "max": "*", "mustSupport": true }
//!     ] }
//! });
//!
//! let mut diagnostics = Diagnostics::new();
//! let elements = resolve(&profile, "Example Patient", &mut diagnostics);
//! assert_eq!(elements[0].element(), "Patient.name");
//! assert_eq!(elements[0].cardinality.to_string(), "1..*");
//! ```

pub mod aggregate;
pub mod cardinality;
pub mod config;
pub mod diagnostics;
pub mod element;
pub mod error;
pub mod instances;
pub mod path;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod walker;

pub use aggregate::{aggregate, CountPolicy, InstanceDocument, ReportRow, UsageCount};
pub use cardinality::{Cardinality, Max};
pub use config::{Config, PackageSpec};
pub use diagnostics::Diagnostics;
pub use element::MustSupportElement;
pub use error::{Error, Result, Warning};
pub use instances::load_instances;
pub use path::{matches_instance_segment, ElementPath, PathSegment};
pub use pipeline::{run, RunOptions, RunSummary};
pub use report::{write_report, write_tsv};
pub use resolver::resolve;
pub use walker::count_usage;
