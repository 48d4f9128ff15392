//! Transformation service client
//!
//! `POST <base>/<structureMap>` with a backend record; the response body is
//! the FHIR resource as JSON text.

use crate::error::{Error, Result};
use crate::http::{build_client, join_url, snippet, FHIR_JSON};
use arcadia_models::OperationOutcome;
use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use std::time::Duration;

const SERVICE: &str = "transformation service";

#[async_trait]
pub trait TransformService: Send + Sync {
    /// Converts one annotated backend record into FHIR JSON text.
    async fn transform(&self, structure_map: &str, record: &Value) -> Result<String>;
}

pub struct TransformClient {
    client: Client,
    base_url: String,
}

impl TransformClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl TransformService for TransformClient {
    async fn transform(&self, structure_map: &str, record: &Value) -> Result<String> {
        let url = join_url(&self.base_url, structure_map);
        tracing::debug!(%url, "Calling transformation service");

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, FHIR_JSON)
            .header(header::ACCEPT, FHIR_JSON)
            .body(serde_json::to_vec(record)?)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, %url, "Transformation call failed"))?;

        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            return Ok(text);
        }

        tracing::error!(status = status.as_u16(), %url, "Transformation service rejected record");
        match OperationOutcome::from_body(&text) {
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn posts_record_to_structure_map() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transform/AllergyMap"))
            .and(header("content-type", FHIR_JSON))
            .and(body_json(json!({"resourceType": "ArcadiaAllergy", "id": "a1"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"resourceType":"AllergyIntolerance","id":"a1"}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client =
            TransformClient::new(format!("{}/transform/", server.uri()), Duration::from_secs(5))
                .unwrap();
        let text = client
            .transform(
                "AllergyMap",
                &json!({"resourceType": "ArcadiaAllergy", "id": "a1"}),
            )
            .await
            .unwrap();

        assert_eq!(text, r#"{"resourceType":"AllergyIntolerance","id":"a1"}"#);
    }

    #[tokio::test]
    async fn outcome_body_becomes_structured_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "resourceType": "OperationOutcome",
                "issue": [{"severity": "error", "code": "processing", "diagnostics": "no rule"}]
            })))
            .mount(&server)
            .await;

        let client = TransformClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        let err = client.transform("Map", &json!({})).await.unwrap_err();

        let Error::Outcome { status, outcome, .. } = err else {
            panic!("expected outcome error, got {err:?}");
        };
        assert_eq!(status, 422);
        assert_eq!(outcome.issue[0].diagnostics.as_deref(), Some("no rule"));
    }

    #[tokio::test]
    async fn plain_failure_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = TransformClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        let err = client.transform("Map", &json!({})).await.unwrap_err();
        assert!(matches!(err, Error::Status { status: 500, .. }));
    }
}
