//! Subject identity extraction

use crate::{Error, Result};
use arcadia_models::SearchParameters;

/// Prefix of every backend person key.
pub const PERSON_KEY_PREFIX: &str = "urn:doid:arcadia.io:person!";

/// Parameters naming the subject, in lookup order.
const SUBJECT_PARAMS: [&str; 2] = ["patient", "subject"];

/// Id of the first `patient` (else `subject`) reference value.
pub fn subject_id(params: &SearchParameters) -> Option<&str> {
    SUBJECT_PARAMS
        .iter()
        .filter_map(|name| params.first_value(name))
        .map(|value| value.value())
        .find(|id| !id.is_empty())
}

pub fn person_key(id: &str) -> String {
    format!("{PERSON_KEY_PREFIX}{id}")
}

/// The backend person key for the request subject.
pub fn require_person_key(params: &SearchParameters) -> Result<String> {
    subject_id(params).map(person_key).ok_or_else(|| {
        Error::MissingRequiredParameter("one of 'patient' or 'subject' is required".to_string())
    })
}
