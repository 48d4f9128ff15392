//! Mock endpoints for the backend, transformation and validation services

use super::{TestApp, AUTH_TOKEN};
use serde_json::{json, Value};
use std::collections::HashSet;
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, Request, Respond, ResponseTemplate};

/// Converts a record into `{resourceType, id, source}`, taking the FHIR type
/// from the structure map name (`...To<Type>`). Provenance ids get a `prov-`
/// prefix so they do not collide with their target.
pub struct EchoTransform;

impl Respond for EchoTransform {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let structure_map = request
            .url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string();
        let resource_type = structure_map
            .rsplit("To")
            .next()
            .unwrap_or_default()
            .to_string();

        let record: Value = match serde_json::from_slice(&request.body) {
            Ok(record) => record,
            Err(_) => return ResponseTemplate::new(400),
        };
        let id = record["id"].as_str().unwrap_or_default();
        let id = if resource_type == "Provenance" {
            format!("prov-{id}")
        } else {
            id.to_string()
        };

        ResponseTemplate::new(200).set_body_json(json!({
            "resourceType": resource_type,
            "id": id,
            "source": record,
        }))
    }
}

/// Answers with an informational outcome, or a 422 error outcome for
/// resources whose id is rejected.
pub struct ProfileValidator {
    pub reject_ids: HashSet<String>,
}

impl Respond for ProfileValidator {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let resource: Value = serde_json::from_slice(&request.body).unwrap_or_default();
        let id = resource["id"].as_str().unwrap_or_default();

        if self.reject_ids.contains(id) {
            ResponseTemplate::new(422).set_body_json(json!({
                "resourceType": "OperationOutcome",
                "issue": [{
                    "severity": "error",
                    "code": "value",
                    "diagnostics": format!("{id} violates profile")
                }]
            }))
        } else {
            ResponseTemplate::new(200).set_body_json(json!({
                "resourceType": "OperationOutcome",
                "issue": [{"severity": "information", "code": "informational", "diagnostics": "ok"}]
            }))
        }
    }
}

impl TestApp {
    pub async fn mount_graphql(&self, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("authorization", format!("Bearer {AUTH_TOKEN}").as_str()))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }

    pub async fn mount_person_search(&self, template: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path("/search/person"))
            .and(header("authorization", format!("Bearer {AUTH_TOKEN}").as_str()))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }

    pub async fn mount_transform(&self) {
        Mock::given(method("POST"))
            .and(path_regex("^/transform/"))
            .respond_with(EchoTransform)
            .mount(&self.server)
            .await;
    }

    pub async fn mount_validation(&self, reject_ids: &[&str]) {
        Mock::given(method("POST"))
            .and(path_regex("^/validate/"))
            .respond_with(ProfileValidator {
                reject_ids: reject_ids.iter().map(|id| id.to_string()).collect(),
            })
            .mount(&self.server)
            .await;
    }

    /// Transformation echoes records and validation accepts everything.
    pub async fn mount_passthrough_services(&self) {
        self.mount_transform().await;
        self.mount_validation(&[]).await;
    }
}

pub fn person(entities: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"data": {"person": entities}}))
}
