use crate::error::Result;
use reqwest::Client;
use std::time::Duration;

/// Media type sent to and accepted from the FHIR-side services.
pub const FHIR_JSON: &str = "application/fhir+json;fhirVersion=4.0";

pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Joins a base URL and an identifier with exactly one `/`.
pub fn join_url(base: &str, segment: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        segment.trim_start_matches('/')
    )
}

/// `base[:port]` followed by `path`.
pub fn with_port(base: &str, port: Option<u16>, path: &str) -> String {
    let base = base.trim_end_matches('/');
    match port {
        Some(port) => format!("{base}:{port}{path}"),
        None => format!("{base}{path}"),
    }
}

/// Cuts a response body down to something that fits in a log line.
pub(crate) fn snippet(body: &str) -> String {
    const LIMIT: usize = 512;
    match body.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
