//! FHIR resource types exposed by the facade

use super::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every resource type served by the facade.
///
/// Each variant must have a resource mapping and a transformation mapping;
/// the mapping catalog checks this exhaustively against [`ResourceType::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    AllergyIntolerance,
    CarePlan,
    CareTeam,
    Condition,
    Device,
    DiagnosticReport,
    DocumentReference,
    Encounter,
    Immunization,
    Location,
    MedicationRequest,
    Observation,
    Organization,
    Patient,
    Practitioner,
    PractitionerRole,
    Procedure,
    Provenance,
}

impl ResourceType {
    pub const ALL: [ResourceType; 18] = [
        ResourceType::AllergyIntolerance,
        ResourceType::CarePlan,
        ResourceType::CareTeam,
        ResourceType::Condition,
        ResourceType::Device,
        ResourceType::DiagnosticReport,
        ResourceType::DocumentReference,
        ResourceType::Encounter,
        ResourceType::Immunization,
        ResourceType::Location,
        ResourceType::MedicationRequest,
        ResourceType::Observation,
        ResourceType::Organization,
        ResourceType::Patient,
        ResourceType::Practitioner,
        ResourceType::PractitionerRole,
        ResourceType::Procedure,
        ResourceType::Provenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::AllergyIntolerance => "AllergyIntolerance",
            ResourceType::CarePlan => "CarePlan",
            ResourceType::CareTeam => "CareTeam",
            ResourceType::Condition => "Condition",
            ResourceType::Device => "Device",
            ResourceType::DiagnosticReport => "DiagnosticReport",
            ResourceType::DocumentReference => "DocumentReference",
            ResourceType::Encounter => "Encounter",
            ResourceType::Immunization => "Immunization",
            ResourceType::Location => "Location",
            ResourceType::MedicationRequest => "MedicationRequest",
            ResourceType::Observation => "Observation",
            ResourceType::Organization => "Organization",
            ResourceType::Patient => "Patient",
            ResourceType::Practitioner => "Practitioner",
            ResourceType::PractitionerRole => "PractitionerRole",
            ResourceType::Procedure => "Procedure",
            ResourceType::Provenance => "Provenance",
        }
    }

    /// Lowercase form, used for demo payload file names.
    pub fn path(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ResourceType::ALL
            .iter()
            .copied()
            .find(|rt| rt.as_str() == s)
            .ok_or_else(|| Error::UnknownResourceType(s.to_string()))
    }
}
