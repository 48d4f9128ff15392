//! Service layer between the HTTP handlers and the resolution pipeline

pub mod metadata;
pub mod resource;

pub use metadata::MetadataService;
pub use resource::ResourceService;
