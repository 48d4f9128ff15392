//! Resolution of FHIR searches into backend entity records
//!
//! A resolver turns `(ResourceType, SearchParameters)` into a
//! [`ResolvedResourceSet`]: the backend records the pipeline will transform,
//! grouped by entity name for one-to-many resource types.
//!
//! Two implementations exist:
//! - [`LiveResolver`]: one query per request against the Arcadia backend
//! - [`DemoResolver`]: canned payloads read from a local folder

pub mod demo;
pub mod identity;
pub mod live;
pub mod person_search;

pub use demo::DemoResolver;
pub use identity::{person_key, require_person_key, subject_id, PERSON_KEY_PREFIX};
pub use live::{plan_query, BackendRequest, LiveResolver};

use crate::{Error, Result};
use arcadia_mapping::EntityNames;
use arcadia_models::{ResourceType, SearchParameters};
use async_trait::async_trait;
use serde_json::Value;

/// Resolves a search into backend records
#[async_trait]
pub trait EndpointResolver: Send + Sync {
    /// Fetch the backend records behind one search
    ///
    /// # Arguments
    /// * `resource_type` - The FHIR resource type being searched
    /// * `params` - Parsed search parameters of the request
    ///
    /// # Errors
    /// * `UnknownResourceType` - No resource mapping for the type
    /// * `MissingRequiredParameter` - Neither `patient` nor `subject` given
    /// * `BackendQueryFailed` - The backend answered with `errors`
    /// * `BackendUnavailable` - Transport failure or unusable payload
    async fn resolve(
        &self,
        resource_type: ResourceType,
        params: &SearchParameters,
    ) -> Result<ResolvedResourceSet>;
}

/// Records found under one entity name
#[derive(Debug, Clone, PartialEq)]
pub enum EntityPayload {
    One(Value),
    Many(Vec<Value>),
}

impl EntityPayload {
    /// Reads the node found under an entity name. Absent or null is empty.
    pub fn from_node(entity_name: &str, node: Option<&Value>) -> Result<Self> {
        match node {
            None | Some(Value::Null) => Ok(EntityPayload::Many(Vec::new())),
            Some(record @ Value::Object(_)) => Ok(EntityPayload::One(record.clone())),
            Some(Value::Array(items)) => Ok(EntityPayload::Many(items.clone())),
            Some(_) => Err(Error::BackendUnavailable(format!(
                "backend entity '{entity_name}' is neither an object nor an array"
            ))),
        }
    }

    pub fn records(&self) -> &[Value] {
        match self {
            EntityPayload::One(record) => std::slice::from_ref(record),
            EntityPayload::Many(records) => records,
        }
    }

    pub fn into_records(self) -> Vec<Value> {
        match self {
            EntityPayload::One(record) => vec![record],
            EntityPayload::Many(records) => records,
        }
    }
}

/// Backend records for one resource type, in backend order
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedResourceSet {
    /// One-to-one resource types
    Flat(Vec<Value>),
    /// One-to-many resource types, in the mapping's declared entity order
    Grouped(Vec<(String, EntityPayload)>),
}

impl ResolvedResourceSet {
    /// `(entity name, records)` per group. Flat sets form one unnamed group.
    pub fn groups(&self) -> Vec<(Option<&str>, &[Value])> {
        match self {
            ResolvedResourceSet::Flat(records) => vec![(None, records.as_slice())],
            ResolvedResourceSet::Grouped(groups) => groups
                .iter()
                .map(|(name, payload)| (Some(name.as_str()), payload.records()))
                .collect(),
        }
    }

    pub fn record_count(&self) -> usize {
        self.groups().iter().map(|(_, records)| records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }
}

/// Reshapes the node holding the entities (`data.person` or a demo payload).
///
/// A missing or null container is an empty result. Duplicate entity names
/// are kept as independent groups.
pub fn reshape(
    container: Option<&Value>,
    entity_names: &EntityNames,
) -> Result<ResolvedResourceSet> {
    let container = match container {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(_) => {
            return Err(Error::BackendUnavailable(
                "backend person payload is not an object".to_string(),
            ))
        }
    };

    let payload_for = |name: &str| {
        EntityPayload::from_node(name, container.and_then(|map| map.get(name)))
    };

    match entity_names {
        EntityNames::One(name) => {
            Ok(ResolvedResourceSet::Flat(payload_for(name)?.into_records()))
        }
        EntityNames::Many(names) => names
            .iter()
            .map(|name| Ok((name.clone(), payload_for(name)?)))
            .collect::<Result<Vec<_>>>()
            .map(ResolvedResourceSet::Grouped),
    }
}
