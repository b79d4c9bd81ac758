//! Models shared by FHIR R4, R4B and R5 content

pub mod bundle;
pub mod element_definition;
pub mod error;
pub mod structure_definition;

pub use bundle::*;
pub use element_definition::*;
pub use error::{Error, Result};
pub use structure_definition::*;
