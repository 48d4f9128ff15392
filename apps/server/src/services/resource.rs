//! Search and read over the resolver and pipeline

use crate::metrics::FHIR_SEARCH_RESULTS;
use crate::pipeline::{AssembledResource, Pipeline};
use crate::resolver::EndpointResolver;
use crate::{Error, Result};
use arcadia_mapping::{MappingCatalog, QueryMode};
use arcadia_models::{
    Bundle, BundleEntry, BundleEntrySearchMode, BundleType, ResourceType, SearchParameters,
};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::sync::Arc;

pub struct ResourceService {
    catalog: MappingCatalog,
    resolver: Arc<dyn EndpointResolver>,
    pipeline: Arc<Pipeline>,
}

impl ResourceService {
    pub fn new(
        catalog: MappingCatalog,
        resolver: Arc<dyn EndpointResolver>,
        pipeline: Arc<Pipeline>,
    ) -> Self {
        Self {
            catalog,
            resolver,
            pipeline,
        }
    }

    /// Resolved and validated resources, primary resources before their Provenance.
    pub async fn assemble(
        &self,
        resource_type: ResourceType,
        params: &SearchParameters,
    ) -> Result<Vec<AssembledResource>> {
        let resolved = self.resolver.resolve(resource_type, params).await?;
        self.pipeline.run(resource_type, &resolved, params).await
    }

    /// Type-level search returning a `searchset` Bundle
    ///
    /// # Arguments
    /// * `base_url` - FHIR base used for entry `fullUrl`s
    /// * `self_url` - Request URL recorded as the Bundle's `self` link
    pub async fn search(
        &self,
        resource_type: ResourceType,
        params: &SearchParameters,
        base_url: &str,
        self_url: &str,
    ) -> Result<Bundle> {
        let resources = self.assemble(resource_type, params).await?;

        let mut bundle = Bundle::new(BundleType::Searchset);
        bundle.id = Some(uuid::Uuid::new_v4().to_string());
        bundle.timestamp = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
        bundle.add_link("self", self_url);

        let matches = resources
            .iter()
            .filter(|r| r.mode == BundleEntrySearchMode::Match)
            .count();
        bundle.total = Some(matches as u32);
        for AssembledResource { resource, mode } in resources {
            bundle.add_entry(BundleEntry::for_resource(base_url, resource, mode));
        }

        FHIR_SEARCH_RESULTS
            .with_label_values(&[resource_type.as_str()])
            .observe(matches as f64);
        Ok(bundle)
    }

    /// Instance read, answered through the person search API.
    ///
    /// Only resource types mapped in person-search mode can be read; the
    /// GraphQL person graph has no lookup by resource id.
    pub async fn read(&self, resource_type: ResourceType, id: &str) -> Result<Value> {
        let entry = self.catalog.resource_mapping(resource_type).await?;
        if entry.query_mode != QueryMode::PersonSearch {
            return Err(Error::NotImplemented(format!(
                "read is not supported for {resource_type}"
            )));
        }

        let params = SearchParameters::new().with("_id", id)?;
        self.assemble(resource_type, &params)
            .await?
            .into_iter()
            .find(|r| r.mode == BundleEntrySearchMode::Match)
            .map(|r| r.resource)
            .ok_or_else(|| Error::ResourceNotFound {
                resource_type: resource_type.to_string(),
                id: id.to_string(),
            })
    }
}
