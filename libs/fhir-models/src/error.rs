//! Error types for FHIR models

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("Invalid search parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    #[error("Invalid field value: {0}")]
    InvalidFieldValue(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
