//! Wire models for the Arcadia backend

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DATA: &str = "data";
pub const PERSON: &str = "person";
pub const ERRORS: &str = "errors";
pub const RECORDS: &str = "records";

/// GraphQL-shaped request body.
#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
}

/// One entry of a backend `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendError {
    #[serde(default)]
    pub message: String,
}

/// Raw result of one backend query.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendQueryResult {
    /// The full success payload; callers navigate `data.person` or `records`.
    Data(Value),
    /// The backend reported errors instead of data.
    Errors(Vec<BackendError>),
}

impl BackendQueryResult {
    /// Classifies a decoded response body. Any `errors` key wins over data.
    pub fn from_body(service: &'static str, body: Value) -> Result<Self> {
        match body.get(ERRORS) {
            None | Some(Value::Null) => Ok(BackendQueryResult::Data(body)),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(message) => Ok(BackendError {
                        message: message.clone(),
                    }),
                    other => serde_json::from_value(other.clone()).map_err(Error::from),
                })
                .collect::<Result<Vec<_>>>()
                .map(BackendQueryResult::Errors),
            Some(_) => Err(Error::InvalidResponse {
                service,
                message: "'errors' is not an array".to_string(),
            }),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, BackendQueryResult::Errors(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn data_payload() {
        let body = json!({"data": {"person": {"allergies": []}}});
        let result = BackendQueryResult::from_body("backend", body.clone()).unwrap();
        assert_eq!(result, BackendQueryResult::Data(body));
    }

    #[test]
    fn errors_keep_order() {
        let result = BackendQueryResult::from_body(
            "backend",
            json!({
                "errors": [{"message": "first"}, {"message": "second", "path": ["person"]}],
                "data": null
            }),
        )
        .unwrap();
        let BackendQueryResult::Errors(errors) = result else {
            panic!("expected errors");
        };
        let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn malformed_errors_are_invalid() {
        assert!(matches!(
            BackendQueryResult::from_body("backend", json!({"errors": "boom"})),
            Err(Error::InvalidResponse { .. })
        ));
    }
}
