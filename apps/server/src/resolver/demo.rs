//! Demo resolver reading canned backend payloads from disk
//!
//! `<folder>/<resource type path>.json` holds what the backend would return
//! under `data.person`, e.g. `allergyintolerance.json`:
//!
//! ```json
//! { "allergies": [ { "id": "a1", "onsetDate": "2020-01-15 00:00:00" } ] }
//! ```

use super::{reshape, EndpointResolver, ResolvedResourceSet};
use crate::{Error, Result};
use arcadia_mapping::MappingCatalog;
use arcadia_models::{ResourceType, SearchParameters};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;

pub struct DemoResolver {
    catalog: MappingCatalog,
    folder: PathBuf,
}

impl DemoResolver {
    pub fn new(catalog: MappingCatalog, folder: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            folder: folder.into(),
        }
    }

    fn payload_path(&self, resource_type: ResourceType) -> PathBuf {
        self.folder.join(format!("{}.json", resource_type.path()))
    }
}

#[async_trait]
impl EndpointResolver for DemoResolver {
    /// Search parameters are logged but do not filter demo payloads.
    async fn resolve(
        &self,
        resource_type: ResourceType,
        params: &SearchParameters,
    ) -> Result<ResolvedResourceSet> {
        let entry = self.catalog.resource_mapping(resource_type).await?;
        let path = self.payload_path(resource_type);
        tracing::info!(%resource_type, path = %path.display(), ?params, "Reading demo payload");

        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ResourceNotFound {
                    resource_type: resource_type.to_string(),
                    id: format!("demo payload {}", path.display()),
                })
            }
            Err(e) => return Err(Error::BackendUnavailable(format!("{}: {e}", path.display()))),
        };

        let person: Value = serde_json::from_str(&text).map_err(|e| {
            Error::BackendUnavailable(format!("malformed demo payload {}: {e}", path.display()))
        })?;
        reshape(Some(&person), &entry.entity_names)
    }
}
