//! Typed descriptors read out of the mapping tables
//!
//! `ResourceMapping.json`:
//!
//! ```json
//! {
//!   "apiInfo": { "querySyntax": "{ person(id: \"<person-id>\") { <arcadia-resource> } }" },
//!   "resources": {
//!     "AllergyIntolerance": { "arcadiaResourceName": "allergies" },
//!     "Condition": { "arcadiaResourceName": ["problems", "diagnoses"] },
//!     "Patient": { "arcadiaResourceName": "person", "queryMode": "personSearch" }
//!   }
//! }
//! ```
//!
//! `TransformationConfig.json` holds one object per one-to-one type and an
//! array (one element per `arcadiaResourceName`) per one-to-many type.

use crate::error::{Error, Result};
use crate::table::{as_mapping, as_opt_str, as_sequence, as_str, kind_of, Node};
use serde_json::Value;

pub const RESOURCES: &str = "resources";
pub const API_INFO: &str = "apiInfo";
pub const QUERY_SYNTAX: &str = "querySyntax";
pub const QUERY_MODE: &str = "queryMode";
pub const ARCADIA_RESOURCE_NAME: &str = "arcadiaResourceName";
pub const STRUCTURE_DEFINITION: &str = "structureDefinition";
pub const STRUCTURE_MAP: &str = "structureMap";
pub const RESOURCE_PROFILE_URL: &str = "resourceProfileUrl";
pub const DATE_FIELDS: &str = "dateFields";
pub const PROVENANCE_STRUCTURE_DEFINITION: &str = "provenanceStructureDefinition";
pub const PROVENANCE_STRUCTURE_MAP: &str = "provenanceStructureMap";
pub const PROVENANCE_PROFILE_URL: &str = "provenanceProfileUrl";

/// Placeholder for the backend person key in query templates.
pub const PERSON_ID_PLACEHOLDER: &str = "<person-id>";
/// Placeholder for the backend entity name(s) in query templates.
pub const ARCADIA_RESOURCE_PLACEHOLDER: &str = "<arcadia-resource>";

/// Backend entity name(s) a resource type is fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityNames {
    One(String),
    Many(Vec<String>),
}

impl EntityNames {
    pub fn as_slice(&self) -> &[String] {
        match self {
            EntityNames::One(name) => std::slice::from_ref(name),
            EntityNames::Many(names) => names,
        }
    }

    pub fn is_many(&self) -> bool {
        matches!(self, EntityNames::Many(_))
    }

    /// Text substituted for `<arcadia-resource>`.
    pub fn query_fragment(&self) -> String {
        self.as_slice().join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    /// GraphQL query against the person graph, keyed by the subject.
    #[default]
    GraphQl,
    /// Query-string search against the person search API.
    PersonSearch,
}

impl QueryMode {
    fn parse(raw: &str) -> Result<Self> {
        match raw {
            "graphql" => Ok(QueryMode::GraphQl),
            "personSearch" => Ok(QueryMode::PersonSearch),
            _ => Err(Error::FieldTypeMismatch {
                key: QUERY_MODE.to_string(),
                expected: "\"graphql\" or \"personSearch\"",
                found: "another string",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMappingEntry {
    pub entity_names: EntityNames,
    pub query_template: String,
    pub query_mode: QueryMode,
}

impl ResourceMappingEntry {
    /// Reads one `resources.<type>` node; `default_template` is `apiInfo.querySyntax`.
    pub fn from_node(node: &Node, default_template: Option<&str>) -> Result<Self> {
        let entity_names = match node.get(ARCADIA_RESOURCE_NAME) {
            Some(Value::Array(items)) if !items.is_empty() => EntityNames::Many(
                items
                    .iter()
                    .map(|item| {
                        item.as_str().map(str::to_string).ok_or_else(|| {
                            Error::FieldTypeMismatch {
                                key: ARCADIA_RESOURCE_NAME.to_string(),
                                expected: "an array of strings",
                                found: kind_of(item),
                            }
                        })
                    })
                    .collect::<Result<_>>()?,
            ),
            _ => EntityNames::One(as_str(node, ARCADIA_RESOURCE_NAME)?.to_string()),
        };

        let query_mode = match as_opt_str(node, QUERY_MODE)? {
            Some(raw) => QueryMode::parse(raw)?,
            None => QueryMode::default(),
        };

        let query_template = match (as_opt_str(node, QUERY_SYNTAX)?, default_template) {
            (Some(template), _) => template.to_string(),
            (None, Some(template)) => template.to_string(),
            (None, None) if query_mode == QueryMode::PersonSearch => String::new(),
            (None, None) => {
                return Err(Error::FieldMissing {
                    key: format!("{API_INFO}.{QUERY_SYNTAX}"),
                })
            }
        };

        Ok(Self {
            entity_names,
            query_template,
            query_mode,
        })
    }

    /// Substitutes the person key and entity names into the template.
    pub fn render_query(&self, person_key: &str) -> String {
        self.query_template
            .replace(PERSON_ID_PLACEHOLDER, person_key)
            .replace(ARCADIA_RESOURCE_PLACEHOLDER, &self.entity_names.query_fragment())
    }
}

/// Transform and validation settings for one backend entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformMappingEntry {
    pub entity_name: Option<String>,
    pub structure_definition: String,
    pub structure_map: String,
    pub resource_profile_url: String,
    pub date_fields: Vec<String>,
    pub provenance_structure_definition: Option<String>,
    pub provenance_structure_map: Option<String>,
    pub provenance_profile_url: Option<String>,
}

impl TransformMappingEntry {
    pub fn from_node(node: &Node) -> Result<Self> {
        let date_fields = match node.get(DATE_FIELDS) {
            None | Some(Value::Null) => Vec::new(),
            Some(_) => as_sequence(node, DATE_FIELDS)?
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| Error::FieldTypeMismatch {
                            key: DATE_FIELDS.to_string(),
                            expected: "an array of strings",
                            found: kind_of(v),
                        })
                })
                .collect::<Result<_>>()?,
        };

        Ok(Self {
            entity_name: as_opt_str(node, ARCADIA_RESOURCE_NAME)?.map(str::to_string),
            structure_definition: as_str(node, STRUCTURE_DEFINITION)?.to_string(),
            structure_map: as_str(node, STRUCTURE_MAP)?.to_string(),
            resource_profile_url: as_str(node, RESOURCE_PROFILE_URL)?.to_string(),
            date_fields,
            provenance_structure_definition: as_opt_str(node, PROVENANCE_STRUCTURE_DEFINITION)?
                .map(str::to_string),
            provenance_structure_map: as_opt_str(node, PROVENANCE_STRUCTURE_MAP)?
                .map(str::to_string),
            provenance_profile_url: as_opt_str(node, PROVENANCE_PROFILE_URL)?.map(str::to_string),
        })
    }

    /// Provenance settings, required once a caller asks for Provenance.
    pub fn provenance(&self) -> Result<ProvenanceMapping<'_>> {
        let structure_definition = self.provenance_structure_definition.as_deref().ok_or(
            Error::FieldMissing {
                key: PROVENANCE_STRUCTURE_DEFINITION.to_string(),
            },
        )?;
        let structure_map =
            self.provenance_structure_map
                .as_deref()
                .ok_or(Error::FieldMissing {
                    key: PROVENANCE_STRUCTURE_MAP.to_string(),
                })?;
        Ok(ProvenanceMapping {
            structure_definition,
            structure_map,
            profile_url: self
                .provenance_profile_url
                .as_deref()
                .unwrap_or(&self.resource_profile_url),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvenanceMapping<'a> {
    pub structure_definition: &'a str,
    pub structure_map: &'a str,
    pub profile_url: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformMapping {
    OneToOne(TransformMappingEntry),
    OneToMany(Vec<TransformMappingEntry>),
}

impl TransformMapping {
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Object(node) => Ok(TransformMapping::OneToOne(
                TransformMappingEntry::from_node(node)?,
            )),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let node = item.as_object().ok_or_else(|| Error::FieldTypeMismatch {
                        key: format!("[{i}]"),
                        expected: "an object",
                        found: kind_of(item),
                    })?;
                    let entry = TransformMappingEntry::from_node(node)
                        .map_err(|e| e.within(&format!("[{i}]")))?;
                    if entry.entity_name.is_none() {
                        return Err(Error::FieldMissing {
                            key: format!("[{i}].{ARCADIA_RESOURCE_NAME}"),
                        });
                    }
                    Ok(entry)
                })
                .collect::<Result<Vec<_>>>()
                .map(TransformMapping::OneToMany),
            Value::Null => Err(Error::FieldMissing { key: String::new() }),
            other => Err(Error::FieldTypeMismatch {
                key: String::new(),
                expected: "an object or an array",
                found: kind_of(other),
            }),
        }
    }

    /// The entry for a resolved entity group. `None` selects the one-to-one entry.
    pub fn entry_for(&self, entity_name: Option<&str>) -> Option<&TransformMappingEntry> {
        match (self, entity_name) {
            (TransformMapping::OneToOne(entry), _) => Some(entry),
            (TransformMapping::OneToMany(entries), Some(name)) => entries
                .iter()
                .find(|e| e.entity_name.as_deref() == Some(name)),
            (TransformMapping::OneToMany(_), None) => None,
        }
    }

    pub fn entries(&self) -> &[TransformMappingEntry] {
        match self {
            TransformMapping::OneToOne(entry) => std::slice::from_ref(entry),
            TransformMapping::OneToMany(entries) => entries,
        }
    }
}

/// `resources.<type>` from a table root.
pub(crate) fn resource_node<'a>(root: &'a Node, resource_type: &str) -> Result<Option<&'a Value>> {
    let resources = as_mapping(root, RESOURCES)?;
    Ok(resources.get(resource_type).filter(|v| !v.is_null()))
}
