//! Application state

use crate::config::{AppMode, Config};
use crate::pipeline::Pipeline;
use crate::resolver::{DemoResolver, EndpointResolver, LiveResolver};
use crate::services::{MetadataService, ResourceService};
use anyhow::Context;
use arcadia_client::{
    BackendClient, BackendClientConfig, BackendQuery, TransformClient, TransformService,
    ValidationClient, ValidationService,
};
use arcadia_mapping::{DirectorySource, MappingCatalog, MappingStore};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: MappingCatalog,
    pub resource_service: Arc<ResourceService>,
    pub metadata_service: Arc<MetadataService>,
}

impl AppState {
    /// Builds the state from configuration, wiring real HTTP clients.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let source = DirectorySource::new(config.mapping.directory.clone());
        let catalog = MappingCatalog::with_file_names(
            Arc::new(MappingStore::new(Arc::new(source))),
            config.mapping.resource_mapping_file.clone(),
            config.mapping.transformation_file.clone(),
        );

        let backend = BackendClient::new(BackendClientConfig {
            base_url: config.backend.base_url.clone(),
            crud_port: config.backend.crud_port,
            search_port: config.backend.search_port,
            auth_token: config.backend.auth_token.clone(),
            timeout: config.backend.timeout(),
        })
        .context("Failed to build backend client")?;
        let transform =
            TransformClient::new(config.transform.url.clone(), config.transform.timeout())
                .context("Failed to build transformation client")?;
        let validation =
            ValidationClient::new(config.validation.url.clone(), config.validation.timeout())
                .context("Failed to build validation client")?;

        Self::with_services(
            config,
            catalog,
            Arc::new(backend),
            Arc::new(transform),
            Arc::new(validation),
        )
    }

    /// Builds the state around caller-supplied service implementations.
    pub fn with_services(
        config: Config,
        catalog: MappingCatalog,
        backend: Arc<dyn BackendQuery>,
        transform: Arc<dyn TransformService>,
        validation: Arc<dyn ValidationService>,
    ) -> anyhow::Result<Self> {
        let resolver: Arc<dyn EndpointResolver> = match config.app.mode {
            AppMode::Live => Arc::new(LiveResolver::new(catalog.clone(), backend)),
            AppMode::Demo => {
                let folder = config
                    .demo
                    .resource_folder
                    .clone()
                    .context("demo.resource_folder is required in demo mode")?;
                tracing::info!(folder = %folder.display(), "Serving demo payloads");
                Arc::new(DemoResolver::new(catalog.clone(), folder))
            }
        };

        let pipeline = Arc::new(Pipeline::new(catalog.clone(), transform, validation));
        let resource_service = Arc::new(ResourceService::new(catalog.clone(), resolver, pipeline));
        let metadata_service = Arc::new(MetadataService::new(catalog.clone()));

        Ok(Self {
            config: Arc::new(config),
            catalog,
            resource_service,
            metadata_service,
        })
    }
}
