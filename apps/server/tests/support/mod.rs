#![allow(dead_code)]

pub mod services;

use anyhow::Context as _;
use arcadia_fhir::{api::create_router, AppState, Config};
use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::path::PathBuf;
use tower::ServiceExt as _;
use wiremock::MockServer;

pub use services::*;

pub const AUTH_TOKEN: &str = "test-token";

/// Router wired to real HTTP clients that talk to one mock server standing in
/// for the Arcadia backend, the transformation service and the validation
/// service.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub server: MockServer,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    pub fn content_type(&self) -> &str {
        self.headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }
}

pub fn mappings_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("mappings")
}

impl TestApp {
    pub async fn new() -> anyhow::Result<Self> {
        Self::new_with_config(|_| {}).await
    }

    pub async fn new_with_config(configure: impl FnOnce(&mut Config)) -> anyhow::Result<Self> {
        let server = MockServer::start().await;

        let mut config = Config::default();
        config.backend.base_url = server.uri();
        config.backend.auth_token = AUTH_TOKEN.to_string();
        config.transform.url = format!("{}/transform/", server.uri());
        config.validation.url = format!("{}/validate/", server.uri());
        config.mapping.directory = mappings_dir();
        configure(&mut config);

        config
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid test config: {e}"))?;
        let state = AppState::new(config).context("initialize AppState")?;
        let router = create_router(state.clone());

        Ok(Self {
            router,
            state,
            server,
        })
    }

    pub async fn get(&self, path_and_query: &str) -> anyhow::Result<TestResponse> {
        self.request(Method::GET, path_and_query, None).await
    }

    pub async fn post_form(&self, path: &str, form: &str) -> anyhow::Result<TestResponse> {
        self.request(
            Method::POST,
            path,
            Some(("application/x-www-form-urlencoded", Bytes::from(form.to_string()))),
        )
        .await
    }

    pub async fn request(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<(&str, Bytes)>,
    ) -> anyhow::Result<TestResponse> {
        let mut builder = Request::builder()
            .method(method)
            .uri(path_and_query)
            .header("host", "example.org")
            .header("accept", "application/fhir+json");
        let body = match body {
            Some((content_type, bytes)) => {
                builder = builder.header("content-type", content_type);
                Body::from(bytes)
            }
            None => Body::empty(),
        };
        let request = builder.body(body).context("build request")?;

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .context("dispatch request")?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .context("read response body")?;

        Ok(TestResponse {
            status,
            headers,
            body,
        })
    }

    /// Requests the mock server received on the given path prefix.
    pub async fn received(&self, path_prefix: &str) -> Vec<wiremock::Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path().starts_with(path_prefix))
            .collect()
    }
}

/// `issue[*].diagnostics` of an OperationOutcome body.
pub fn diagnostics(outcome: &Value) -> Vec<String> {
    outcome["issue"]
        .as_array()
        .map(|issues| {
            issues
                .iter()
                .filter_map(|i| i["diagnostics"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub fn entries(bundle: &Value) -> Vec<Value> {
    bundle["entry"].as_array().cloned().unwrap_or_default()
}
