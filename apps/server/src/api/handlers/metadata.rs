//! Metadata endpoint handler
//!
//! Handles the FHIR capabilities interaction (GET /metadata)

use super::fhir_json;
use crate::{state::AppState, Result};
use axum::{extract::State, http::HeaderMap, response::Response};

/// Get server capability statement (GET /metadata)
pub async fn capability_statement(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response> {
    let base_url = crate::api::url::base_url(&state.config, &headers);
    let capability_statement = state
        .metadata_service
        .capability_statement(&base_url)
        .await;

    fhir_json(&capability_statement)
}
