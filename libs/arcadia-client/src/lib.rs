//! Clients for the services behind the Arcadia FHIR facade
//!
//! - [`BackendClient`]: GraphQL and person-search queries against the Arcadia backend
//! - [`TransformClient`]: structure-map driven conversion of backend records to FHIR
//! - [`ValidationClient`]: profile validation of transformed resources
//!
//! Each client sits behind an async trait so callers can substitute stubs.
//!
//! ```rust,no_run
//! use arcadia_client::{BackendClient, BackendClientConfig, BackendQuery};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = BackendClient::new(BackendClientConfig {
//!     base_url: "http://arcadia.local".to_string(),
//!     crud_port: Some(8082),
//!     search_port: Some(8083),
//!     auth_token: "token".to_string(),
//!     timeout: Duration::from_secs(30),
//! })?;
//! let result = client.execute_query("{ person(id: \"x\") { allergies } }").await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod error;
pub mod http;
pub mod models;
pub mod transform;
pub mod validation;

pub use backend::{BackendClient, BackendClientConfig, BackendQuery};
pub use error::{Error, Result};
pub use http::FHIR_JSON;
pub use models::{BackendError, BackendQueryResult};
pub use transform::{TransformClient, TransformService};
pub use validation::{ValidationClient, ValidationService};
