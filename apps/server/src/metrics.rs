//! Prometheus metrics for the FHIR facade

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, HistogramVec,
    IntCounterVec, IntGaugeVec,
};
use std::time::Instant;

lazy_static! {
    // HTTP Request Metrics

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "arcadia_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("Failed to register HTTP_REQUESTS_TOTAL");

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "arcadia_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");

    /// In-flight HTTP requests
    pub static ref HTTP_REQUESTS_IN_FLIGHT: IntGaugeVec = register_int_gauge_vec!(
        "arcadia_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
        &["method", "path"]
    )
    .expect("Failed to register HTTP_REQUESTS_IN_FLIGHT");

    /// HTTP request body size in bytes
    pub static ref HTTP_REQUEST_SIZE_BYTES: HistogramVec = register_histogram_vec!(
        "arcadia_http_request_size_bytes",
        "HTTP request body size in bytes",
        &["method", "path"],
        vec![100.0, 1_000.0, 10_000.0, 100_000.0, 1_000_000.0, 10_000_000.0]
    )
    .expect("Failed to register HTTP_REQUEST_SIZE_BYTES");

    /// HTTP response size in bytes
    pub static ref HTTP_RESPONSE_SIZE_BYTES: HistogramVec = register_histogram_vec!(
        "arcadia_http_response_size_bytes",
        "HTTP response size in bytes",
        &["method", "path", "status"],
        vec![100.0, 1_000.0, 10_000.0, 100_000.0, 1_000_000.0, 10_000_000.0]
    )
    .expect("Failed to register HTTP_RESPONSE_SIZE_BYTES");

    // FHIR Operation Metrics

    /// FHIR interactions by resource type, interaction and outcome
    pub static ref FHIR_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "arcadia_fhir_operations_total",
        "Total number of FHIR interactions",
        &["resource_type", "operation", "status"]
    )
    .expect("Failed to register FHIR_OPERATIONS_TOTAL");

    /// Resources returned by search
    pub static ref FHIR_SEARCH_RESULTS: HistogramVec = register_histogram_vec!(
        "arcadia_fhir_search_results",
        "Number of resources returned by search",
        &["resource_type"],
        vec![0.0, 1.0, 10.0, 50.0, 100.0, 500.0, 1000.0]
    )
    .expect("Failed to register FHIR_SEARCH_RESULTS");

    // Backend and remote service metrics

    /// Backend queries by mode and outcome (data, errors, unavailable)
    pub static ref BACKEND_QUERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "arcadia_backend_queries_total",
        "Total number of Arcadia backend queries",
        &["mode", "outcome"]
    )
    .expect("Failed to register BACKEND_QUERIES_TOTAL");

    /// Remote call duration by service (backend, transform, validation)
    pub static ref REMOTE_CALL_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "arcadia_remote_call_duration_seconds",
        "Duration of calls to remote services in seconds",
        &["service"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("Failed to register REMOTE_CALL_DURATION_SECONDS");

    /// Records dropped because validation reported error or fatal issues
    pub static ref RESOURCES_DROPPED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "arcadia_resources_dropped_total",
        "Total number of transformed resources dropped after failed validation",
        &["resource_type"]
    )
    .expect("Failed to register RESOURCES_DROPPED_TOTAL");
}

/// Helper to sanitize path for metrics labels (remove IDs, limit cardinality)
pub fn sanitize_path(path: &str) -> String {
    let path = path.strip_prefix("/fhir").unwrap_or(path);
    let segments: Vec<&str> = path.split('/').collect();

    match segments.len() {
        0 | 1 | 2 => path.to_string(),
        // /ResourceType/_search keeps its literal segment
        3 if segments[2] == "_search" || segments[2].is_empty() => segments.join("/"),
        // /ResourceType/:id -> /ResourceType/{id}
        _ => format!("{}/{}/{}", segments[0], segments[1], "{id}"),
    }
}

/// Times one remote call and records it under `service`.
pub struct RemoteCallTimer {
    service: &'static str,
    start: Instant,
}

impl RemoteCallTimer {
    pub fn start(service: &'static str) -> Self {
        Self {
            service,
            start: Instant::now(),
        }
    }
}

impl Drop for RemoteCallTimer {
    fn drop(&mut self) {
        REMOTE_CALL_DURATION_SECONDS
            .with_label_values(&[self.service])
            .observe(self.start.elapsed().as_secs_f64());
    }
}

/// Extract FHIR resource type from path
pub fn extract_resource_type(path: &str) -> Option<String> {
    let path = path
        .strip_prefix("/fhir/")
        .or_else(|| path.strip_prefix("/fhir"))?;
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if segments.is_empty() {
        return None;
    }

    // First segment should be resource type (unless it's a special path)
    let first = segments[0];
    if first.starts_with('_') || first.starts_with('$') || first == "metadata" {
        return None;
    }

    Some(first.to_string())
}

/// Extract FHIR interaction from path and method
pub fn extract_operation(method: &str, path: &str) -> Option<String> {
    let path = path
        .strip_prefix("/fhir/")
        .or_else(|| path.strip_prefix("/fhir"))?;
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (method, segments.as_slice()) {
        ("GET", ["metadata"]) => Some("capabilities".to_string()),
        ("GET", [_]) | ("POST", [_, "_search"]) | ("GET", [_, "_search"]) => {
            Some("search".to_string())
        }
        ("GET", [_, _]) => Some("read".to_string()),
        _ => None,
    }
}
