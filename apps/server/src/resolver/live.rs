//! Live resolver against the Arcadia backend

use super::identity::require_person_key;
use super::person_search::build_query_string;
use super::{reshape, EndpointResolver, ResolvedResourceSet};
use crate::metrics::{RemoteCallTimer, BACKEND_QUERIES_TOTAL};
use crate::{Error, Result};
use arcadia_client::models::{DATA, PERSON, RECORDS};
use arcadia_client::{BackendQuery, BackendQueryResult};
use arcadia_mapping::{MappingCatalog, QueryMode, ResourceMappingEntry};
use arcadia_models::{IssueType, OutcomeIssue, ResourceType, SearchParameters};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// The one backend call a search turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendRequest {
    /// GraphQL query text
    GraphQl(String),
    /// Person search query string
    PersonSearch(String),
}

impl BackendRequest {
    fn mode(&self) -> &'static str {
        match self {
            BackendRequest::GraphQl(_) => "graphql",
            BackendRequest::PersonSearch(_) => "person_search",
        }
    }
}

/// Builds the backend request for a search without executing it.
///
/// GraphQL mode requires a subject; its absence fails here, before any
/// backend call is made.
pub fn plan_query(
    entry: &ResourceMappingEntry,
    params: &SearchParameters,
) -> Result<BackendRequest> {
    match entry.query_mode {
        QueryMode::GraphQl => {
            let person_key = require_person_key(params)?;
            Ok(BackendRequest::GraphQl(entry.render_query(&person_key)))
        }
        QueryMode::PersonSearch => Ok(BackendRequest::PersonSearch(build_query_string(params)?)),
    }
}

pub struct LiveResolver {
    catalog: MappingCatalog,
    backend: Arc<dyn BackendQuery>,
}

impl LiveResolver {
    pub fn new(catalog: MappingCatalog, backend: Arc<dyn BackendQuery>) -> Self {
        Self { catalog, backend }
    }

    async fn execute(&self, request: &BackendRequest) -> Result<BackendQueryResult> {
        let _timer = RemoteCallTimer::start("backend");
        let result = match request {
            BackendRequest::GraphQl(query) => self.backend.execute_query(query).await,
            BackendRequest::PersonSearch(query_string) => {
                self.backend.execute_search(query_string).await
            }
        };

        let outcome = match &result {
            Ok(BackendQueryResult::Data(_)) => "data",
            Ok(BackendQueryResult::Errors(_)) => "errors",
            Err(_) => "unavailable",
        };
        BACKEND_QUERIES_TOTAL
            .with_label_values(&[request.mode(), outcome])
            .inc();

        result.map_err(Error::backend)
    }
}

#[async_trait]
impl EndpointResolver for LiveResolver {
    #[tracing::instrument(name = "resolve", skip_all, fields(resource_type = %resource_type))]
    async fn resolve(
        &self,
        resource_type: ResourceType,
        params: &SearchParameters,
    ) -> Result<ResolvedResourceSet> {
        let entry = self.catalog.resource_mapping(resource_type).await?;
        let request = plan_query(&entry, params)?;
        tracing::debug!(?request, "Planned backend request");

        let body = match self.execute(&request).await? {
            BackendQueryResult::Data(body) => body,
            BackendQueryResult::Errors(errors) => {
                tracing::warn!(count = errors.len(), "Backend reported errors");
                return Err(Error::BackendQueryFailed {
                    issues: errors
                        .into_iter()
                        .map(|e| OutcomeIssue::error(IssueType::Invalid, e.message))
                        .collect(),
                });
            }
        };

        let set = match request {
            BackendRequest::GraphQl(_) => {
                let data = body
                    .get(DATA)
                    .filter(|d| d.is_object())
                    .ok_or_else(|| {
                        Error::BackendUnavailable("backend response carries no 'data'".to_string())
                    })?;
                reshape(data.get(PERSON), &entry.entity_names)?
            }
            BackendRequest::PersonSearch(_) => {
                let records = body.get(RECORDS).cloned().unwrap_or(Value::Null);
                let container: Map<String, Value> = entry
                    .entity_names
                    .as_slice()
                    .iter()
                    .map(|name| (name.clone(), records.clone()))
                    .collect();
                reshape(Some(&Value::Object(container)), &entry.entity_names)?
            }
        };

        tracing::info!(records = set.record_count(), "Resolved backend records");
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{catalog, BackendReply, StubBackend};
    use serde_json::json;

    fn resolver(backend: Arc<StubBackend>) -> LiveResolver {
        LiveResolver::new(catalog(), backend)
    }

    #[tokio::test]
    async fn every_graphql_type_sends_one_query_with_key_and_entities() {
        let catalog = catalog();
        for resource_type in ResourceType::ALL {
            let entry = catalog.resource_mapping(resource_type).await.unwrap();
            if entry.query_mode != QueryMode::GraphQl {
                continue;
            }
            let backend = Arc::new(StubBackend::new(BackendReply::Data(
                json!({"data": {"person": {}}}),
            )));
            let params = SearchParameters::new().with("patient", "Patient/77").unwrap();

            resolver(backend.clone())
                .resolve(resource_type, &params)
                .await
                .unwrap();

            let calls = backend.calls();
            assert_eq!(calls.len(), 1, "{resource_type}");
            assert!(calls[0].contains("urn:doid:arcadia.io:person!77"));
            for name in entry.entity_names.as_slice() {
                assert!(calls[0].contains(name.as_str()), "{resource_type}: {name}");
            }
        }
    }

    #[tokio::test]
    async fn missing_subject_never_reaches_backend() {
        let backend = Arc::new(StubBackend::new(BackendReply::Data(json!({}))));
        let err = resolver(backend.clone())
            .resolve(ResourceType::AllergyIntolerance, &SearchParameters::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingRequiredParameter(_)));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn backend_errors_become_issues_in_order() {
        let backend = Arc::new(StubBackend::new(BackendReply::Errors(vec![
            "Unknown field 'allergies'",
            "Person not found",
        ])));
        let params = SearchParameters::new().with("patient", "1").unwrap();

        let err = resolver(backend)
            .resolve(ResourceType::AllergyIntolerance, &params)
            .await
            .unwrap_err();

        let Error::BackendQueryFailed { issues } = err else {
            panic!("expected BackendQueryFailed, got {err:?}");
        };
        let diagnostics: Vec<_> = issues
            .iter()
            .map(|i| i.diagnostics.as_deref().unwrap_or_default())
            .collect();
        assert_eq!(diagnostics, vec!["Unknown field 'allergies'", "Person not found"]);
        assert!(issues.iter().all(|i| i.code == IssueType::Invalid));
    }

    #[tokio::test]
    async fn transport_failure_is_backend_unavailable() {
        let backend = Arc::new(StubBackend::new(BackendReply::Unavailable));
        let params = SearchParameters::new().with("subject", "1").unwrap();

        let err = resolver(backend)
            .resolve(ResourceType::Observation, &params)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn single_mapping_becomes_one_record() {
        let backend = Arc::new(StubBackend::new(BackendReply::Data(json!({
            "data": {"person": {"allergies": {"id": "a1"}}}
        }))));
        let params = SearchParameters::new().with("patient", "1").unwrap();

        let set = resolver(backend)
            .resolve(ResourceType::AllergyIntolerance, &params)
            .await
            .unwrap();
        assert_eq!(set, ResolvedResourceSet::Flat(vec![json!({"id": "a1"})]));
    }

    #[tokio::test]
    async fn null_person_is_empty_and_missing_data_is_unavailable() {
        let params = SearchParameters::new().with("patient", "1").unwrap();

        let backend = Arc::new(StubBackend::new(BackendReply::Data(
            json!({"data": {"person": null}}),
        )));
        let set = resolver(backend)
            .resolve(ResourceType::AllergyIntolerance, &params)
            .await
            .unwrap();
        assert!(set.is_empty());

        let backend = Arc::new(StubBackend::new(BackendReply::Data(json!({"person": {}}))));
        let err = resolver(backend)
            .resolve(ResourceType::AllergyIntolerance, &params)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn person_search_uses_records() {
        let backend = Arc::new(StubBackend::new(BackendReply::Data(json!({
            "records": [{"id": "p1"}]
        }))));
        let params = SearchParameters::new().with("identifier", "MR|12345").unwrap();

        let set = resolver(backend.clone())
            .resolve(ResourceType::Patient, &params)
            .await
            .unwrap();

        assert_eq!(set.record_count(), 1);
        assert_eq!(backend.calls(), vec!["search:mrn=12345&query=*".to_string()]);
    }

    #[tokio::test]
    async fn unmapped_type_is_unknown() {
        let backend = Arc::new(StubBackend::new(BackendReply::Data(json!({}))));
        let catalog = crate::test_support::catalog_with(
            r#"{"apiInfo": {"querySyntax": "<person-id>"}, "resources": {}}"#,
            crate::test_support::TRANSFORMATION_CONFIG,
        );
        let params = SearchParameters::new().with("patient", "1").unwrap();

        let err = LiveResolver::new(catalog, backend.clone())
            .resolve(ResourceType::Device, &params)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownResourceType(_)));
        assert!(backend.calls().is_empty());
    }
}
