//! Validation service client
//!
//! `POST <base>/<resourceProfileUrl>` with FHIR JSON text; the response is an
//! OperationOutcome describing the resource.

use crate::error::{Error, Result};
use crate::http::{build_client, join_url, snippet, FHIR_JSON};
use arcadia_models::OperationOutcome;
use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;

const SERVICE: &str = "validation service";

#[async_trait]
pub trait ValidationService: Send + Sync {
    async fn validate(&self, profile_url: &str, resource: &str) -> Result<OperationOutcome>;
}

pub struct ValidationClient {
    client: Client,
    base_url: String,
}

impl ValidationClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl ValidationService for ValidationClient {
    /// A 4xx answer that carries an OperationOutcome is still a verdict on the
    /// resource. Anything else that is not 2xx is a service failure.
    async fn validate(&self, profile_url: &str, resource: &str) -> Result<OperationOutcome> {
        let url = join_url(&self.base_url, profile_url);
        tracing::debug!(%url, "Calling validation service");

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, FHIR_JSON)
            .header(header::ACCEPT, FHIR_JSON)
            .body(resource.to_string())
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, %url, "Validation call failed"))?;

        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            return serde_json::from_str(&text).map_err(|e| Error::InvalidResponse {
                service: SERVICE,
                message: format!("expected an OperationOutcome: {e}"),
            });
        }

        match OperationOutcome::from_body(&text) {
            Some(outcome) if status.is_client_error() => Ok(outcome),
            Some(outcome) => Err(Error::Outcome {
                service: SERVICE,
                status: status.as_u16(),
                outcome,
            }),
            None => Err(Error::Status {
                service: SERVICE,
                status: status.as_u16(),
                body: snippet(&text),
            }),
        }
    }
}
