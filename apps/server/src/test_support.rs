//! Stubs and fixtures shared by unit tests

use arcadia_client::{
    BackendError, BackendQuery, BackendQueryResult, TransformService, ValidationService,
};
use arcadia_mapping::{
    MappingCatalog, MappingStore, StaticSource, RESOURCE_MAPPING_FILE, TRANSFORMATION_CONFIG_FILE,
};
use arcadia_models::{IssueSeverity, IssueType, OperationOutcome, OutcomeIssue};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub(crate) const RESOURCE_MAPPING: &str = include_str!("../mappings/ResourceMapping.json");
pub(crate) const TRANSFORMATION_CONFIG: &str =
    include_str!("../mappings/TransformationConfig.json");

pub(crate) fn catalog() -> MappingCatalog {
    catalog_with(RESOURCE_MAPPING, TRANSFORMATION_CONFIG)
}

pub(crate) fn catalog_with(resource_mapping: &str, transformation: &str) -> MappingCatalog {
    let source = StaticSource::new()
        .with_document(RESOURCE_MAPPING_FILE, resource_mapping)
        .with_document(TRANSFORMATION_CONFIG_FILE, transformation);
    MappingCatalog::new(Arc::new(MappingStore::new(Arc::new(source))))
}

fn unavailable(service: &'static str) -> arcadia_client::Error {
    arcadia_client::Error::Status {
        service,
        status: 503,
        body: "service down".to_string(),
    }
}

pub(crate) enum BackendReply {
    Data(Value),
    Errors(Vec<&'static str>),
    Unavailable,
}

/// Records every query; GraphQL text as-is, person searches as `search:<qs>`.
pub(crate) struct StubBackend {
    reply: BackendReply,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl StubBackend {
    pub(crate) fn new(reply: BackendReply) -> Self {
        Self {
            reply,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, call: String) -> arcadia_client::Result<BackendQueryResult> {
        self.calls.lock().unwrap().push(call);
        match &self.reply {
            BackendReply::Data(body) => Ok(BackendQueryResult::Data(body.clone())),
            BackendReply::Errors(messages) => Ok(BackendQueryResult::Errors(
                messages
                    .iter()
                    .map(|m| BackendError {
                        message: m.to_string(),
                    })
                    .collect(),
            )),
            BackendReply::Unavailable => Err(unavailable("arcadia backend")),
        }
    }
}

#[async_trait]
impl BackendQuery for StubBackend {
    async fn execute_query(&self, query_text: &str) -> arcadia_client::Result<BackendQueryResult> {
        self.answer(query_text.to_string())
    }

    async fn execute_search(
        &self,
        query_string: &str,
    ) -> arcadia_client::Result<BackendQueryResult> {
        self.answer(format!("search:{query_string}"))
    }
}

/// Produces `{resourceType, id, source}` where the type is the structure map
/// suffix after the last `To` and `source` is the record that was sent.
#[derive(Default)]
pub(crate) struct StubTransform {
    pub(crate) reject_ids: HashSet<String>,
    pub(crate) unavailable: bool,
    pub(crate) calls: Mutex<Vec<(String, Value)>>,
}

impl StubTransform {
    pub(crate) fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransformService for StubTransform {
    async fn transform(
        &self,
        structure_map: &str,
        record: &Value,
    ) -> arcadia_client::Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((structure_map.to_string(), record.clone()));
        if self.unavailable {
            return Err(unavailable("transformation service"));
        }

        let id = record.get("id").and_then(Value::as_str).unwrap_or_default();
        if self.reject_ids.contains(id) {
            return Err(arcadia_client::Error::Outcome {
                service: "transformation service",
                status: 422,
                outcome: OperationOutcome::new(vec![OutcomeIssue::error(
                    IssueType::Processing,
                    format!("cannot map {id}"),
                )]),
            });
        }

        let resource_type = structure_map.rsplit("To").next().unwrap_or(structure_map);
        let id = if resource_type == "Provenance" {
            format!("prov-{id}")
        } else {
            id.to_string()
        };
        Ok(json!({"resourceType": resource_type, "id": id, "source": record}).to_string())
    }
}

/// Flags resources whose id is in `reject_ids` with an error issue.
#[derive(Default)]
pub(crate) struct StubValidator {
    pub(crate) reject_ids: HashSet<String>,
    pub(crate) unavailable: bool,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl StubValidator {
    pub(crate) fn profiles(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ValidationService for StubValidator {
    async fn validate(
        &self,
        profile_url: &str,
        resource: &str,
    ) -> arcadia_client::Result<OperationOutcome> {
        self.calls.lock().unwrap().push(profile_url.to_string());
        if self.unavailable {
            return Err(unavailable("validation service"));
        }

        let value: Value = serde_json::from_str(resource)?;
        let id = value.get("id").and_then(Value::as_str).unwrap_or_default();
        let issue = if self.reject_ids.contains(id) {
            OutcomeIssue::new(IssueSeverity::Error, IssueType::Value, "profile violation")
        } else {
            OutcomeIssue::new(
                IssueSeverity::Information,
                IssueType::Other("informational".into()),
                "ok",
            )
        };
        Ok(OperationOutcome::new(vec![issue]))
    }
}

pub(crate) fn ids(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|id| id.to_string()).collect()
}
