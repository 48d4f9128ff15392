//! FHIR-facing value types for the Arcadia facade
//!
//! - `resource_type`: the closed set of resource types the facade serves
//! - `search`: typed, AND-of-OR search parameters plus include directives
//! - `outcome`: OperationOutcome and its issues
//! - `bundle`: searchset Bundles returned to clients
//!
//! # Example
//!
//! ```rust
//! use arcadia_models::{ResourceType, SearchParameters};
//!
//! let params = SearchParameters::new()
//!     .with("patient", "Patient/123")
//!     .unwrap();
//! assert_eq!(params.first_value("patient").unwrap().value(), "123");
//! assert_eq!("Observation".parse::<ResourceType>().unwrap(), ResourceType::Observation);
//! ```

pub mod bundle;
pub mod error;
pub mod outcome;
pub mod resource_type;
pub mod search;

pub use bundle::*;
pub use error::{Error, Result};
pub use outcome::*;
pub use resource_type::ResourceType;
pub use search::*;
