//! Backend date normalization
//!
//! The backend emits `2020-01-15 00:00:00` (optionally with fractional
//! seconds); FHIR instants need `2020-01-15T00:00:00.000Z`. The wall-clock
//! value is kept as is, no timezone conversion takes place.

use chrono::NaiveDateTime;
use serde_json::{Map, Value};

const BACKEND_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];
const FHIR_INSTANT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Converts one backend timestamp, or `None` when it does not parse.
pub fn normalize_date(raw: &str) -> Option<String> {
    BACKEND_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|dt| dt.format(FHIR_INSTANT_FORMAT).to_string())
}

/// Rewrites the listed fields in place. Values that are not parseable
/// strings stay untouched.
pub fn normalize_fields(record: &mut Map<String, Value>, fields: &[String]) {
    for field in fields {
        match record.get_mut(field) {
            None | Some(Value::Null) => {}
            Some(Value::String(raw)) => match normalize_date(raw) {
                Some(normalized) => *raw = normalized,
                None => {
                    tracing::warn!(%field, value = %raw, "Unparsable backend date left unchanged")
                }
            },
            Some(other) => {
                tracing::warn!(%field, value = %other, "Non-string backend date left unchanged")
            }
        }
    }
}
