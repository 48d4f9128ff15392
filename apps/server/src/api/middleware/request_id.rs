//! Request identity and the root request span

use crate::metrics::{extract_operation, extract_resource_type};
use crate::request_context::RequestContext;
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use opentelemetry::trace::TraceContextExt;
use std::time::Instant;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use uuid::Uuid;

const REQUEST_ID: &str = "x-request-id";
const CORRELATION_ID: &str = "x-correlation-id";
const TRACE_ID: &str = "x-trace-id";

/// Identifiers stamped on every response.
#[derive(Debug, Clone, PartialEq)]
struct ResponseIds {
    request_id: String,
    /// Client-supplied `x-request-id`, kept only when it differs from ours
    correlation_id: Option<String>,
    trace_id: String,
}

impl ResponseIds {
    fn apply(&self, headers: &mut HeaderMap) {
        let pairs = [
            (REQUEST_ID, Some(&self.request_id)),
            (TRACE_ID, Some(&self.trace_id)),
            (CORRELATION_ID, self.correlation_id.as_ref()),
        ];
        for (name, value) in pairs {
            if let Some(value) = value.and_then(|v| HeaderValue::from_str(v).ok()) {
                headers.insert(name, value);
            }
        }
    }
}

/// Opens the `http_request` span that the resolver and pipeline spans nest
/// under, and assigns the server's own request id.
///
/// A client `x-request-id` never replaces ours; it comes back as
/// `x-correlation-id`. `x-trace-id` carries the OpenTelemetry trace id so a
/// search can be followed through the backend, transform and validation
/// calls.
#[tracing::instrument(
    name = "http_request",
    skip_all,
    fields(
        http.method = %req.method(),
        http.route = %req.uri().path(),
        otel.kind = "server",
        http.response.status_code = tracing::field::Empty,
        fhir.resource_type = tracing::field::Empty,
        fhir.operation = tracing::field::Empty,
        request_id = tracing::field::Empty,
    )
)]
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let span = Span::current();
    let start = Instant::now();

    let request_id = Uuid::new_v4().to_string();
    let client_id = req
        .headers()
        .get(REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    span.record("request_id", request_id.as_str());

    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    if let Some(resource_type) = extract_resource_type(&path) {
        span.record("fhir.resource_type", resource_type.as_str());
    }
    if let Some(operation) = extract_operation(method.as_str(), &path) {
        span.record("fhir.operation", operation.as_str());
    }

    req.extensions_mut().insert(RequestContext {
        request_id: request_id.clone(),
    });

    let mut response = next.run(req).await;
    let status = response.status().as_u16();
    span.record("http.response.status_code", status);
    tracing::info!(
        %method,
        %path,
        status,
        duration_ms = start.elapsed().as_millis(),
        "Request completed"
    );

    let ids = ResponseIds {
        correlation_id: client_id.filter(|id| *id != request_id),
        trace_id: span.context().span().span_context().trace_id().to_string(),
        request_id,
    };
    ids.apply(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_header_only_when_present() {
        let mut headers = HeaderMap::new();
        ResponseIds {
            request_id: "server".into(),
            correlation_id: None,
            trace_id: "00000000000000000000000000000000".into(),
        }
        .apply(&mut headers);
        assert_eq!(headers[REQUEST_ID], "server");
        assert!(headers.get(CORRELATION_ID).is_none());

        ResponseIds {
            request_id: "server".into(),
            correlation_id: Some("client-42".into()),
            trace_id: "t".into(),
        }
        .apply(&mut headers);
        assert_eq!(headers[CORRELATION_ID], "client-42");
        assert_eq!(headers[TRACE_ID], "t");
    }

    #[test]
    fn unrepresentable_values_are_skipped() {
        let mut headers = HeaderMap::new();
        ResponseIds {
            request_id: "ok".into(),
            correlation_id: Some("bad\nvalue".into()),
            trace_id: "t".into(),
        }
        .apply(&mut headers);
        assert!(headers.get(CORRELATION_ID).is_none());
        assert_eq!(headers.len(), 2);
    }
}
