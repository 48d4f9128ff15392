//! API layer - routes, handlers, and middleware

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod url;

use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;

/// Content type of every FHIR response body, errors included.
pub const FHIR_JSON_CONTENT_TYPE: &str = "application/fhir+json; charset=utf-8";

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.server.max_request_body_size;
    let cors_origins = state.config.server.cors_origins.clone();

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Root endpoint
        .route("/", get(root))
        // Favicon handler (returns 204 to prevent 404 logs)
        .route("/favicon.ico", get(favicon))
        // Metrics endpoint
        .merge(routes::metrics::metrics_routes())
        // FHIR API routes
        .nest("/fhir", routes::fhir::fhir_routes())
        .with_state(state)
        // Add middleware (applied in reverse order)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(axum::middleware::from_fn(middleware::metrics_middleware))
        .layer(middleware::compression())
        .layer(middleware::cors(&cors_origins))
        .layer(middleware::trace())
        .layer(DefaultBodyLimit::max(max_body_size))
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "arcadia-fhir"
    }))
}

async fn root(State(state): State<AppState>) -> impl IntoResponse {
    // Informational endpoint, not a FHIR interaction.
    (
        StatusCode::OK,
        Json(json!({
            "server": "Arcadia FHIR Server",
            "version": env!("CARGO_PKG_VERSION"),
            "fhirVersion": "4.0.1",
            "mode": state.config.mode(),
            "status": "running"
        })),
    )
}

async fn favicon() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}
