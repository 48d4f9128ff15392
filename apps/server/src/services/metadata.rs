//! Metadata Service
//!
//! Generates the FHIR CapabilityStatement from the resource types the facade
//! exposes and the query mode each one is mapped with.

use crate::pipeline::PROVENANCE_TARGET;
use arcadia_mapping::{MappingCatalog, QueryMode};
use arcadia_models::ResourceType;
use chrono::Utc;
use serde_json::{json, Value as JsonValue};

const SMART_SECURITY_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/restful-security-service";
const OAUTH_URIS_EXTENSION: &str =
    "http://fhir-registry.smarthealthit.org/StructureDefinition/oauth-uris";

/// Search parameter advertised for a resource type
struct SearchParam {
    name: &'static str,
    r#type: &'static str,
}

const SUBJECT_PARAMS: &[SearchParam] = &[
    SearchParam {
        name: "patient",
        r#type: "reference",
    },
    SearchParam {
        name: "subject",
        r#type: "reference",
    },
];

const PERSON_SEARCH_PARAMS: &[SearchParam] = &[
    SearchParam {
        name: "_id",
        r#type: "token",
    },
    SearchParam {
        name: "name",
        r#type: "string",
    },
    SearchParam {
        name: "family",
        r#type: "string",
    },
    SearchParam {
        name: "birthdate",
        r#type: "date",
    },
    SearchParam {
        name: "identifier",
        r#type: "token",
    },
    SearchParam {
        name: "gender",
        r#type: "token",
    },
];

/// Service for generating FHIR CapabilityStatement
pub struct MetadataService {
    catalog: MappingCatalog,
}

impl MetadataService {
    pub fn new(catalog: MappingCatalog) -> Self {
        Self { catalog }
    }

    pub async fn capability_statement(&self, base_url: &str) -> JsonValue {
        let now = Utc::now();
        let mut resources = Vec::with_capacity(ResourceType::ALL.len());
        for resource_type in ResourceType::ALL {
            resources.push(self.resource_capability(resource_type).await);
        }

        json!({
            "resourceType": "CapabilityStatement",
            "id": "arcadia-fhir-server",
            "url": format!("{}/metadata", base_url),
            "version": env!("CARGO_PKG_VERSION"),
            "name": "ArcadiaFhirServer",
            "title": "Arcadia FHIR Server",
            "status": "active",
            "date": now.to_rfc3339(),
            "publisher": "Arcadia FHIR Server",
            "kind": "instance",
            "software": {
                "name": "Arcadia FHIR Server",
                "version": env!("CARGO_PKG_VERSION"),
            },
            "implementation": {
                "description": "Read-only FHIR R4 facade over the Arcadia data platform",
                "url": base_url,
            },
            "fhirVersion": "4.0.1",
            "format": ["application/fhir+json"],
            "rest": [{
                "mode": "server",
                "security": {
                    "cors": true,
                    "extension": [{
                        "url": OAUTH_URIS_EXTENSION,
                        "extension": [
                            {"url": "authorize", "valueUri": ""},
                            {"url": "token", "valueUri": ""}
                        ]
                    }],
                    "service": [{
                        "coding": [{
                            "system": SMART_SECURITY_SYSTEM,
                            "code": "SMART-on-FHIR"
                        }],
                        "text": "OAuth2 using SMART-on-FHIR profile (see http://docs.smarthealthit.org)"
                    }]
                },
                "resource": resources,
            }]
        })
    }

    async fn resource_capability(&self, resource_type: ResourceType) -> JsonValue {
        let params = match self.catalog.resource_mapping(resource_type).await {
            Ok(entry) if entry.query_mode == QueryMode::PersonSearch => PERSON_SEARCH_PARAMS,
            Ok(_) => SUBJECT_PARAMS,
            Err(e) => {
                tracing::warn!(%resource_type, error = %e, "Resource type has no usable mapping");
                SUBJECT_PARAMS
            }
        };

        json!({
            "type": resource_type.as_str(),
            "interaction": [
                {"code": "read"},
                {"code": "search-type"}
            ],
            "searchRevInclude": [PROVENANCE_TARGET],
            "searchParam": params
                .iter()
                .map(|p| json!({"name": p.name, "type": p.r#type}))
                .collect::<Vec<_>>(),
        })
    }
}
