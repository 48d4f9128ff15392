//! Error types for the mapping store

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to load mapping config '{name}': {message}")]
    ConfigLoad { name: String, message: String },

    #[error("Mapping field '{key}' is missing")]
    FieldMissing { key: String },

    #[error("Mapping field '{key}' should be {expected}, found {found}")]
    FieldTypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("No mapping configured for resource type {0}")]
    UnknownResourceType(String),

    #[error("Inconsistent mapping for {resource_type}: {message}")]
    Inconsistent {
        resource_type: String,
        message: String,
    },
}

impl Error {
    /// Prefixes the field key with the enclosing path, e.g. `resources.Patient`.
    pub fn within(self, prefix: &str) -> Self {
        match self {
            Error::FieldMissing { key } => Error::FieldMissing {
                key: join_key(prefix, &key),
            },
            Error::FieldTypeMismatch {
                key,
                expected,
                found,
            } => Error::FieldTypeMismatch {
                key: join_key(prefix, &key),
                expected,
                found,
            },
            other => other,
        }
    }
}

fn join_key(prefix: &str, key: &str) -> String {
    if key.is_empty() {
        prefix.to_string()
    } else if key.starts_with('[') {
        format!("{prefix}{key}")
    } else {
        format!("{prefix}.{key}")
    }
}

pub type Result<T> = std::result::Result<T, Error>;
