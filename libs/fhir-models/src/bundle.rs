//! FHIR Bundle model
//!
//! Only the parts of Bundle a read-only search facade produces.

use super::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// FHIR Bundle resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    /// Resource type - always "Bundle"
    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type")]
    pub bundle_type: BundleType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// If search, the total number of matches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<Vec<BundleLink>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<Vec<BundleEntry>>,
}

fn default_resource_type() -> String {
    "Bundle".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BundleType {
    Searchset,
    Collection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleLink {
    pub relation: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<BundleEntrySearch>,
}

impl BundleEntry {
    /// Entry for a resource, with `fullUrl` derived from its type and id when present.
    pub fn for_resource(base_url: &str, resource: Value, mode: BundleEntrySearchMode) -> Self {
        let full_url = match (
            resource.get("resourceType").and_then(Value::as_str),
            resource.get("id").and_then(Value::as_str),
        ) {
            (Some(rt), Some(id)) => {
                Some(format!("{}/{}/{}", base_url.trim_end_matches('/'), rt, id))
            }
            _ => None,
        };
        Self {
            full_url,
            resource: Some(resource),
            search: Some(BundleEntrySearch {
                search_mode: Some(mode),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntrySearch {
    /// Why this entry is in the result set
    #[serde(rename = "mode", skip_serializing_if = "Option::is_none")]
    pub search_mode: Option<BundleEntrySearchMode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleEntrySearchMode {
    /// This resource matched the search specification
    Match,
    /// Returned because of an _include or _revinclude
    Include,
}

impl Bundle {
    pub fn new(bundle_type: BundleType) -> Self {
        Self {
            resource_type: "Bundle".to_string(),
            id: None,
            bundle_type,
            timestamp: None,
            total: None,
            link: None,
            entry: None,
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(Error::from)
    }

    pub fn entry_count(&self) -> usize {
        self.entry.as_ref().map(|e| e.len()).unwrap_or(0)
    }

    pub fn entries(&self) -> &[BundleEntry] {
        self.entry.as_deref().unwrap_or(&[])
    }

    pub fn add_entry(&mut self, entry: BundleEntry) {
        self.entry.get_or_insert_with(Vec::new).push(entry);
    }

    pub fn add_link(&mut self, relation: impl Into<String>, url: impl Into<String>) {
        self.link.get_or_insert_with(Vec::new).push(BundleLink {
            relation: relation.into(),
            url: url.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_empty_searchset() {
        let mut bundle = Bundle::new(BundleType::Searchset);
        bundle.total = Some(0);
        let json = bundle.to_value().unwrap();
        assert_eq!(json["resourceType"], "Bundle");
        assert_eq!(json["type"], "searchset");
        assert_eq!(json["total"], 0);
        assert!(json.get("entry").is_none());
    }

    #[test]
    fn test_entry_full_url() {
        let entry = BundleEntry::for_resource(
            "http://example.org/fhir/",
            json!({"resourceType": "Patient", "id": "123"}),
            BundleEntrySearchMode::Match,
        );
        assert_eq!(
            entry.full_url.as_deref(),
            Some("http://example.org/fhir/Patient/123")
        );

        let anonymous = BundleEntry::for_resource(
            "http://example.org/fhir",
            json!({"resourceType": "Provenance"}),
            BundleEntrySearchMode::Include,
        );
        assert!(anonymous.full_url.is_none());
        let value = serde_json::to_value(&anonymous).unwrap();
        assert_eq!(value["search"]["mode"], "include");
    }

    #[test]
    fn test_add_entry_and_link() {
        let mut bundle = Bundle::new(BundleType::Searchset);
        bundle.add_entry(BundleEntry::for_resource(
            "http://example.org/fhir",
            json!({"resourceType": "Patient", "id": "1"}),
            BundleEntrySearchMode::Match,
        ));
        bundle.add_link("self", "http://example.org/fhir/Patient?_id=1");
        assert_eq!(bundle.entry_count(), 1);
        assert_eq!(bundle.link.as_ref().unwrap()[0].relation, "self");
    }
}
