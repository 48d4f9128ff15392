//! Instance read handler (GET /{resource_type}/{id})

use super::fhir_json;
use crate::{state::AppState, Result};
use arcadia_models::ResourceType;
use axum::{
    extract::{Path, State},
    response::Response,
};

pub async fn read_resource(
    State(state): State<AppState>,
    Path((resource_type, id)): Path<(String, String)>,
) -> Result<Response> {
    let resource_type: ResourceType = resource_type.parse()?;
    let resource = state.resource_service.read(resource_type, &id).await?;
    fhir_json(&resource)
}
