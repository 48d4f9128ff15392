//! Arcadia FHIR facade
//!
//! A read-only FHIR R4 REST surface over the Arcadia data platform:
//! - Resolves FHIR searches into Arcadia GraphQL or person-search queries
//! - Converts backend records to FHIR through an external transformation service
//! - Drops resources the validation service rejects against their profile
//! - Assembles search results, with optional Provenance, into searchset Bundles

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod request_context;
pub mod resolver;
pub mod services;
pub mod state;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
