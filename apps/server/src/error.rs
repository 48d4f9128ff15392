//! Error types for the FHIR facade

use arcadia_models::{IssueSeverity, IssueType, OperationOutcome, OutcomeIssue};
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Mapping config '{name}' could not be loaded: {message}")]
    ConfigLoad { name: String, message: String },

    #[error("Mapping field '{key}' is missing")]
    ConfigFieldMissing { key: String },

    #[error("Mapping field '{key}' has the wrong type: {message}")]
    ConfigFieldTypeMismatch { key: String, message: String },

    #[error("No mapping configured for resource type {0}")]
    UnknownResourceType(String),

    #[error("Missing required parameter: {0}")]
    MissingRequiredParameter(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Resource type not supported: {0}")]
    UnsupportedResourceType(String),

    #[error("Resource not found: {resource_type}/{id}")]
    ResourceNotFound { resource_type: String, id: String },

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Backend query failed with {} issue(s)", issues.len())]
    BackendQueryFailed { issues: Vec<OutcomeIssue> },

    #[error("Transformation failed with {} issue(s)", issues.len())]
    TransformationFailed { issues: Vec<OutcomeIssue> },

    #[error("Transformation service unavailable: {0}")]
    TransformationUnavailable(String),

    #[error("Validation service unavailable: {0}")]
    ValidationUnavailable(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Classifies a backend client failure. Backend-reported `errors` never
    /// reach this path; they arrive as data and become [`Error::BackendQueryFailed`].
    pub fn backend(err: arcadia_client::Error) -> Self {
        Error::BackendUnavailable(err.to_string())
    }

    /// A transform rejection carrying an OperationOutcome keeps its issues.
    pub fn transform(err: arcadia_client::Error) -> Self {
        match err {
            arcadia_client::Error::Outcome { outcome, .. } => Error::TransformationFailed {
                issues: outcome.issue,
            },
            other => Error::TransformationUnavailable(other.to_string()),
        }
    }

    pub fn validation(err: arcadia_client::Error) -> Self {
        Error::ValidationUnavailable(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::ConfigLoad { .. }
            | Error::UnsupportedResourceType(_)
            | Error::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            Error::MissingRequiredParameter(_) | Error::InvalidParameter(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Error::ConfigFieldMissing { .. }
            | Error::ConfigFieldTypeMismatch { .. }
            | Error::UnknownResourceType(_)
            | Error::BackendUnavailable(_)
            | Error::BackendQueryFailed { .. }
            | Error::TransformationFailed { .. }
            | Error::TransformationUnavailable(_)
            | Error::ValidationUnavailable(_)
            | Error::Internal(_)
            | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Issues rendered into the OperationOutcome body.
    pub fn issues(&self) -> Vec<OutcomeIssue> {
        match self {
            Error::BackendQueryFailed { issues } | Error::TransformationFailed { issues }
                if !issues.is_empty() =>
            {
                issues.clone()
            }
            Error::BackendQueryFailed { .. } | Error::TransformationFailed { .. } => {
                vec![OutcomeIssue::error(IssueType::Exception, self.to_string())]
            }
            Error::Internal(_) | Error::Other(_) => vec![OutcomeIssue::new(
                IssueSeverity::Error,
                IssueType::Exception,
                "Internal server error",
            )],
            Error::MissingRequiredParameter(_) => {
                vec![OutcomeIssue::error(IssueType::Required, self.to_string())]
            }
            Error::UnsupportedResourceType(_) | Error::NotImplemented(_) => {
                vec![OutcomeIssue::error(IssueType::NotSupported, self.to_string())]
            }
            _ => vec![OutcomeIssue::error(
                status_to_fhir_code(self.status()),
                self.to_string(),
            )],
        }
    }
}

impl From<arcadia_mapping::Error> for Error {
    fn from(err: arcadia_mapping::Error) -> Self {
        use arcadia_mapping::Error as Mapping;
        match err {
            Mapping::ConfigLoad { name, message } => Error::ConfigLoad { name, message },
            Mapping::FieldMissing { key } => Error::ConfigFieldMissing { key },
            Mapping::FieldTypeMismatch {
                key,
                expected,
                found,
            } => Error::ConfigFieldTypeMismatch {
                key,
                message: format!("expected {expected}, found {found}"),
            },
            Mapping::UnknownResourceType(resource_type) => {
                Error::UnknownResourceType(resource_type)
            }
            other @ Mapping::Inconsistent { .. } => Error::Internal(other.to_string()),
        }
    }
}

impl From<arcadia_models::Error> for Error {
    fn from(err: arcadia_models::Error) -> Self {
        use arcadia_models::Error as Models;
        match err {
            Models::UnknownResourceType(name) => Error::UnsupportedResourceType(name),
            Models::InvalidParameter { name, message } => {
                Error::InvalidParameter(format!("'{name}': {message}"))
            }
            Models::InvalidFieldValue(message) => Error::InvalidParameter(message),
            Models::SerializationError(e) => Error::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = Json(OperationOutcome::new(self.issues()));
        let mut response = (status, body).into_response();

        // Always emit a FHIR content type for OperationOutcome errors.
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(crate::api::FHIR_JSON_CONTENT_TYPE),
        );

        response
    }
}

fn status_to_fhir_code(status: StatusCode) -> IssueType {
    match status {
        StatusCode::BAD_REQUEST => IssueType::Invalid,
        StatusCode::NOT_FOUND => IssueType::NotFound,
        StatusCode::NOT_IMPLEMENTED => IssueType::NotSupported,
        _ => IssueType::Exception,
    }
}
