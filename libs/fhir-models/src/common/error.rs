//! Model errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("expected a {expected} resource, found {found}")]
    UnexpectedResourceType {
        expected: &'static str,
        found: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
