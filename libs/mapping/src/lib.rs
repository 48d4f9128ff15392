//! Mapping config store for the Arcadia facade
//!
//! Loads and caches the resource-mapping and transformation-mapping tables,
//! and exposes them as typed descriptors per [`arcadia_models::ResourceType`].

pub mod catalog;
pub mod descriptors;
pub mod error;
pub mod loader;
pub mod store;
pub mod table;

pub use catalog::{
    MappingCatalog, MappingProblem, RESOURCE_MAPPING_FILE, TRANSFORMATION_CONFIG_FILE,
};
pub use descriptors::{
    EntityNames, ProvenanceMapping, QueryMode, ResourceMappingEntry, TransformMapping,
    TransformMappingEntry,
};
pub use error::{Error, Result};
pub use loader::{DirectorySource, MappingSource, StaticSource};
pub use store::MappingStore;
pub use table::MappingTable;
