//! FHIR OperationOutcome model
//!
//! Used both for rendering error bodies and for reading the verdicts returned
//! by the remote transform and validation services. Deserialization is lenient:
//! severity is matched case-insensitively, a missing or unknown severity is
//! kept as non-blocking, and a missing issue code reads as `processing`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IssueSeverity {
    Fatal,
    Error,
    Warning,
    Information,
    /// Missing or unrecognised severity from a remote service; never blocking.
    Unknown(String),
}

impl IssueSeverity {
    pub fn as_str(&self) -> &str {
        match self {
            IssueSeverity::Fatal => "fatal",
            IssueSeverity::Error => "error",
            IssueSeverity::Warning => "warning",
            IssueSeverity::Information => "information",
            IssueSeverity::Unknown(raw) => raw,
        }
    }

    /// `true` for severities that make the associated resource invalid.
    pub fn is_blocking(&self) -> bool {
        matches!(self, IssueSeverity::Fatal | IssueSeverity::Error)
    }
}

impl Default for IssueSeverity {
    fn default() -> Self {
        IssueSeverity::Unknown(String::new())
    }
}

impl From<&str> for IssueSeverity {
    fn from(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "fatal" => IssueSeverity::Fatal,
            "error" => IssueSeverity::Error,
            "warning" => IssueSeverity::Warning,
            "information" => IssueSeverity::Information,
            _ => IssueSeverity::Unknown(raw.to_string()),
        }
    }
}

impl Serialize for IssueSeverity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for IssueSeverity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(IssueSeverity::from).unwrap_or_default())
    }
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subset of the FHIR issue-type value set used by this server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IssueType {
    Invalid,
    Required,
    Value,
    NotFound,
    NotSupported,
    Processing,
    Exception,
    Timeout,
    /// Any other code reported by a remote service.
    Other(String),
}

impl IssueType {
    pub fn as_str(&self) -> &str {
        match self {
            IssueType::Invalid => "invalid",
            IssueType::Required => "required",
            IssueType::Value => "value",
            IssueType::NotFound => "not-found",
            IssueType::NotSupported => "not-supported",
            IssueType::Processing => "processing",
            IssueType::Exception => "exception",
            IssueType::Timeout => "timeout",
            IssueType::Other(code) => code,
        }
    }
}

impl From<&str> for IssueType {
    fn from(code: &str) -> Self {
        match code.to_ascii_lowercase().as_str() {
            "invalid" => IssueType::Invalid,
            "required" => IssueType::Required,
            "value" => IssueType::Value,
            "not-found" => IssueType::NotFound,
            "not-supported" => IssueType::NotSupported,
            "processing" => IssueType::Processing,
            "exception" => IssueType::Exception,
            "timeout" => IssueType::Timeout,
            _ => IssueType::Other(code.to_string()),
        }
    }
}

impl Default for IssueType {
    fn default() -> Self {
        IssueType::Processing
    }
}

impl Serialize for IssueType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for IssueType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(IssueType::from).unwrap_or_default())
    }
}

/// A single structured error or warning entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeIssue {
    #[serde(default)]
    pub severity: IssueSeverity,
    #[serde(default)]
    pub code: IssueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<Vec<String>>,
}

impl OutcomeIssue {
    pub fn new(severity: IssueSeverity, code: IssueType, diagnostics: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            diagnostics: Some(diagnostics.into()),
            details: None,
            expression: None,
        }
    }

    pub fn error(code: IssueType, diagnostics: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Error, code, diagnostics)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    #[serde(default = "default_resource_type")]
    pub resource_type: String,
    #[serde(default)]
    pub issue: Vec<OutcomeIssue>,
}

fn default_resource_type() -> String {
    "OperationOutcome".to_string()
}

impl OperationOutcome {
    pub fn new(issue: Vec<OutcomeIssue>) -> Self {
        Self {
            resource_type: default_resource_type(),
            issue,
        }
    }

    /// Any error or fatal issue marks the checked resource invalid.
    pub fn has_blocking_issues(&self) -> bool {
        self.issue.iter().any(|i| i.severity.is_blocking())
    }

    pub fn blocking_issues(&self) -> impl Iterator<Item = &OutcomeIssue> {
        self.issue.iter().filter(|i| i.severity.is_blocking())
    }

    /// Parses a body as an OperationOutcome, returning `None` when it is not one.
    pub fn from_body(body: &str) -> Option<Self> {
        let outcome: OperationOutcome = serde_json::from_str(body).ok()?;
        (outcome.resource_type == "OperationOutcome").then_some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn severity_parses_case_insensitively() {
        let outcome: OperationOutcome = serde_json::from_value(json!({
            "resourceType": "OperationOutcome",
            "issue": [
                {"severity": "ERROR", "code": "invalid", "diagnostics": "bad"},
                {"severity": "Warning", "code": "informational"}
            ]
        }))
        .unwrap();

        assert_eq!(outcome.issue[0].severity, IssueSeverity::Error);
        assert_eq!(outcome.issue[1].severity, IssueSeverity::Warning);
        assert_eq!(
            outcome.issue[1].code,
            IssueType::Other("informational".to_string())
        );
        assert!(outcome.has_blocking_issues());
    }

    #[test]
    fn odd_issues_are_tolerated_and_not_blocking() {
        let outcome: OperationOutcome = serde_json::from_value(json!({
            "resourceType": "OperationOutcome",
            "issue": [
                {"severity": "information", "diagnostics": "All OK"},
                {"severity": "notice", "code": "informational"},
                {"severity": null, "code": null},
                {"diagnostics": "no severity at all"}
            ]
        }))
        .unwrap();

        assert_eq!(outcome.issue[0].code, IssueType::Processing);
        assert_eq!(
            outcome.issue[1].severity,
            IssueSeverity::Unknown("notice".to_string())
        );
        assert_eq!(outcome.issue[2].severity, IssueSeverity::default());
        assert_eq!(outcome.issue[3].severity, IssueSeverity::default());
        assert!(!outcome.has_blocking_issues());
    }

    #[test]
    fn warnings_only_are_not_blocking() {
        let outcome = OperationOutcome::new(vec![OutcomeIssue::new(
            IssueSeverity::Warning,
            IssueType::Value,
            "minor",
        )]);
        assert!(!outcome.has_blocking_issues());
        assert_eq!(outcome.blocking_issues().count(), 0);
    }

    #[test]
    fn from_body_rejects_other_resources() {
        assert!(OperationOutcome::from_body(r#"{"resourceType":"Patient"}"#).is_none());
        assert!(OperationOutcome::from_body("not json").is_none());
        let outcome =
            OperationOutcome::from_body(r#"{"resourceType":"OperationOutcome","issue":[]}"#)
                .unwrap();
        assert!(outcome.issue.is_empty());
    }

    #[test]
    fn serializes_fhir_shape() {
        let outcome = OperationOutcome::new(vec![OutcomeIssue::error(
            IssueType::NotFound,
            "missing",
        )]);
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            value,
            json!({
                "resourceType": "OperationOutcome",
                "issue": [{"severity": "error", "code": "not-found", "diagnostics": "missing"}]
            })
        );
    }
}
