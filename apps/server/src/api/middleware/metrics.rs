//! Prometheus accounting for every HTTP exchange

use crate::metrics::{
    extract_operation, extract_resource_type, sanitize_path, FHIR_OPERATIONS_TOTAL,
    HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS,
    HTTP_REQUEST_SIZE_BYTES, HTTP_RESPONSE_SIZE_BYTES,
};
use axum::{
    extract::Request,
    http::{header::CONTENT_LENGTH, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

/// Holds the in-flight gauge up for one request, including requests whose
/// future is dropped before a response is produced.
struct InFlight {
    labels: [String; 2],
}

impl InFlight {
    fn enter(method: &str, route: &str) -> Self {
        let labels = [method.to_string(), route.to_string()];
        HTTP_REQUESTS_IN_FLIGHT
            .with_label_values(&[&labels[0], &labels[1]])
            .inc();
        Self { labels }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        HTTP_REQUESTS_IN_FLIGHT
            .with_label_values(&[&self.labels[0], &self.labels[1]])
            .dec();
    }
}

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let route = sanitize_path(&path);
    let _in_flight = InFlight::enter(&method, &route);

    if let Some(size) = content_length(req.headers()) {
        HTTP_REQUEST_SIZE_BYTES
            .with_label_values(&[&method, &route])
            .observe(size);
    }

    let response = next.run(req).await;
    let status = response.status().as_u16().to_string();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &route, &status])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &route])
        .observe(start.elapsed().as_secs_f64());
    if let Some(size) = content_length(response.headers()) {
        HTTP_RESPONSE_SIZE_BYTES
            .with_label_values(&[&method, &route, &status])
            .observe(size);
    }

    // search, read and capabilities interactions
    if let (Some(resource_type), Some(operation)) = (
        extract_resource_type(&path),
        extract_operation(&method, &path),
    ) {
        FHIR_OPERATIONS_TOTAL
            .with_label_values(&[&resource_type, &operation, outcome(response.status())])
            .inc();
    }

    response
}

fn content_length(headers: &HeaderMap) -> Option<f64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn outcome(status: StatusCode) -> &'static str {
    if status.is_success() {
        "success"
    } else if status.is_client_error() {
        "client_error"
    } else {
        "server_error"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn outcome_buckets() {
        assert_eq!(outcome(StatusCode::OK), "success");
        assert_eq!(outcome(StatusCode::NOT_FOUND), "client_error");
        assert_eq!(outcome(StatusCode::NOT_IMPLEMENTED), "server_error");
    }

    #[test]
    fn content_length_ignores_garbage() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_length(&headers), None);
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("512"));
        assert_eq!(content_length(&headers), Some(512.0));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("lots"));
        assert_eq!(content_length(&headers), None);
    }

    #[test]
    fn in_flight_gauge_returns_to_zero() {
        let gauge = HTTP_REQUESTS_IN_FLIGHT.with_label_values(&["GET", "/fhir/Gauge"]);
        {
            let _guard = InFlight::enter("GET", "/fhir/Gauge");
            assert_eq!(gauge.get(), 1);
        }
        assert_eq!(gauge.get(), 0);
    }
}
