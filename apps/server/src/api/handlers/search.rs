//! Search operation handlers
//!
//! Handles type-level FHIR search:
//! - GET  /{resource_type}?{params}
//! - POST /{resource_type}/_search with an `application/x-www-form-urlencoded` body

use super::fhir_json;
use crate::{
    api::url as api_url, request_context::RequestContext, state::AppState, Error, Result,
};
use arcadia_models::{ResourceType, SearchParameters};
use axum::{
    extract::{Path, Request, State},
    http::{HeaderMap, Method},
    response::Response,
    Extension,
};

/// Search resources of a specific type (GET/POST /{resource_type})
///
/// - 200 OK with Bundle (type=searchset)
/// - Unknown resource types are rejected before any backend call
pub async fn search_type(
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
    context: Option<Extension<RequestContext>>,
    headers: HeaderMap,
    request: Request,
) -> Result<Response> {
    let resource_type: ResourceType = resource_type.parse()?;
    let base_url = api_url::base_url(&state.config, &headers);

    let method = request.method().clone();
    let raw_query = request.uri().query().map(str::to_string);
    let body_bytes = axum::body::to_bytes(
        request.into_body(),
        state.config.server.max_request_body_size,
    )
    .await
    .map_err(|e| Error::InvalidParameter(format!("Failed to read request body: {}", e)))?;

    let items = extract_search_items(&method, raw_query.as_deref(), &headers, &body_bytes)?;
    let params = SearchParameters::from_items(&items)?;
    let self_url = self_link(&base_url, resource_type, &items);

    tracing::debug!(
        %resource_type,
        params = items.len(),
        request_id = context.as_ref().map(|c| c.request_id.as_str()),
        "Executing search"
    );
    let bundle = state
        .resource_service
        .search(resource_type, &params, &base_url, &self_url)
        .await?;

    fhir_json(&bundle.to_value()?)
}

/// Extract and merge search parameters from query string and POST body.
///
/// - GET: Parameters from query string only
/// - POST: Parameters from query string AND body (application/x-www-form-urlencoded)
fn extract_search_items(
    method: &Method,
    raw_query: Option<&str>,
    headers: &HeaderMap,
    body_bytes: &[u8],
) -> Result<Vec<(String, String)>> {
    let mut items = Vec::new();

    // Query string items (already percent-decoded).
    if let Some(q) = raw_query {
        items.extend(parse_form_urlencoded(q));
    }

    if method == Method::POST && !body_bytes.is_empty() {
        let content_type = headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !content_type.is_empty() && !content_type.contains("application/x-www-form-urlencoded")
        {
            return Err(Error::InvalidParameter(format!(
                "POST search requires Content-Type: application/x-www-form-urlencoded, got: {}",
                content_type
            )));
        }

        let body_str = std::str::from_utf8(body_bytes)
            .map_err(|_| Error::InvalidParameter("Invalid UTF-8 in request body".to_string()))?;
        items.extend(parse_form_urlencoded(body_str));
    }

    Ok(items)
}

fn parse_form_urlencoded(s: &str) -> Vec<(String, String)> {
    // `+` decodes to a space, as in application/x-www-form-urlencoded.
    url::form_urlencoded::parse(s.as_bytes())
        .into_owned()
        .collect()
}

/// `self` link for the search Bundle, always in GET form.
fn self_link(base_url: &str, resource_type: ResourceType, items: &[(String, String)]) -> String {
    let mut link = format!("{}/{}", base_url, resource_type);
    if !items.is_empty() {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in items {
            serializer.append_pair(k, v);
        }
        link.push('?');
        link.push_str(&serializer.finish());
    }
    link
}
