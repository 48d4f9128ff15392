//! Request handlers for API endpoints
//!
//! Handlers coordinate between routes and services, handling:
//! - Request extraction and validation
//! - Service invocation
//! - Response formatting

pub mod metadata;
pub mod metrics;
pub mod read;
pub mod search;

pub use metadata::*;
pub use metrics::*;
pub use read::*;
pub use search::*;

use crate::api::FHIR_JSON_CONTENT_TYPE;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// 200 response carrying a FHIR JSON body.
pub(crate) fn fhir_json(body: &serde_json::Value) -> crate::Result<Response> {
    let body = serde_json::to_vec(body).map_err(|e| crate::Error::Internal(e.to_string()))?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, FHIR_JSON_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}
