//! Per-request context injected by middleware.

/// Inserted into request extensions by `request_id_middleware`.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}
