//! Arcadia backend client
//!
//! Two read-only endpoints: the GraphQL person graph on the CRUD service and
//! the person search API on the search service. Both take a bearer token.

use crate::error::{Error, Result};
use crate::http::{build_client, snippet, with_port};
use crate::models::{BackendQueryResult, GraphQlRequest, ERRORS};
use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde_json::Value;
use std::time::Duration;

const SERVICE: &str = "arcadia backend";

/// Executes backend queries. No retries are performed.
#[async_trait]
pub trait BackendQuery: Send + Sync {
    /// POSTs `{"query": <query_text>}` to the GraphQL endpoint.
    async fn execute_query(&self, query_text: &str) -> Result<BackendQueryResult>;

    /// GETs `/search/person?<query_string>` from the search endpoint.
    async fn execute_search(&self, query_string: &str) -> Result<BackendQueryResult>;
}

#[derive(Debug, Clone)]
pub struct BackendClientConfig {
    pub base_url: String,
    pub crud_port: Option<u16>,
    pub search_port: Option<u16>,
    pub auth_token: String,
    pub timeout: Duration,
}

/// Client for the Arcadia backend.
pub struct BackendClient {
    client: Client,
    config: BackendClientConfig,
}

impl BackendClient {
    pub fn new(config: BackendClientConfig) -> Result<Self> {
        let client = build_client(config.timeout)?;
        Ok(Self { client, config })
    }

    pub fn graphql_url(&self) -> String {
        with_port(&self.config.base_url, self.config.crud_port, "/graphql")
    }

    pub fn search_url(&self, query_string: &str) -> String {
        let mut url = with_port(&self.config.base_url, self.config.search_port, "/search/person");
        if !query_string.is_empty() {
            url.push('?');
            url.push_str(query_string);
        }
        url
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.config.auth_token)
    }
}

#[async_trait]
impl BackendQuery for BackendClient {
    async fn execute_query(&self, query_text: &str) -> Result<BackendQueryResult> {
        let url = self.graphql_url();
        tracing::debug!(%url, query = query_text, "Executing backend GraphQL query");

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, self.bearer())
            .json(&GraphQlRequest { query: query_text })
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, %url, "Backend GraphQL call failed"))?;

        read_result(response).await
    }

    async fn execute_search(&self, query_string: &str) -> Result<BackendQueryResult> {
        let url = self.search_url(query_string);
        tracing::debug!(%url, "Executing backend person search");

        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, self.bearer())
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, %url, "Backend search call failed"))?;

        read_result(response).await
    }
}

/// A body carrying `errors` is a backend-reported failure whatever the status;
/// any other non-2xx response is a transport failure.
async fn read_result(response: Response) -> Result<BackendQueryResult> {
    let status = response.status();
    let text = response.text().await?;

    match (status.is_success(), serde_json::from_str::<Value>(&text)) {
        (true, Ok(body)) => BackendQueryResult::from_body(SERVICE, body),
        (false, Ok(body)) if body.get(ERRORS).is_some() => {
            BackendQueryResult::from_body(SERVICE, body)
        }
        (false, _) => Err(Error::Status {
            service: SERVICE,
            status: status.as_u16(),
            body: snippet(&text),
        }),
        (true, Err(e)) => Err(Error::InvalidResponse {
            service: SERVICE,
            message: format!("response body is not JSON: {e}"),
        }),
    }
}
