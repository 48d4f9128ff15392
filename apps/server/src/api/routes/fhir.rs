//! FHIR API Routes
//!
//! Read-only REST surface: capabilities, type-level search and instance read.
//!
//! # URL Handling
//!
//! - **Case Sensitivity**: URLs and ids are case-sensitive; `/Patient` and
//!   `/patient` are different routes, and the latter is rejected as an
//!   unsupported resource type.
//! - **Trailing Slashes**: Both forms are accepted. No redirects are used; both
//!   forms are registered as routes.

use crate::api::handlers::{metadata, read, search};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn fhir_routes() -> Router<AppState> {
    Router::new()
        // Exact routes first (more specific)
        .route("/metadata", get(metadata::capability_statement))
        .route("/metadata/", get(metadata::capability_statement))
        // Type-level search (must come before /:resource_type/:id to match _search exactly)
        .route("/:resource_type/_search", post(search::search_type))
        .route("/:resource_type/_search/", post(search::search_type))
        .route("/:resource_type", get(search::search_type))
        .route("/:resource_type/", get(search::search_type))
        // Instance read
        .route("/:resource_type/:id", get(read::read_resource))
        .route("/:resource_type/:id/", get(read::read_resource))
}
