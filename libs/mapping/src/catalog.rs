//! Typed lookups over the two mapping tables

use crate::descriptors::{
    resource_node, EntityNames, ResourceMappingEntry, TransformMapping, API_INFO, QUERY_SYNTAX,
    RESOURCES,
};
use crate::error::{Error, Result};
use crate::store::MappingStore;
use crate::table::{as_mapping, as_opt_str, kind_of};
use arcadia_models::ResourceType;
use std::sync::Arc;

pub const RESOURCE_MAPPING_FILE: &str = "ResourceMapping.json";
pub const TRANSFORMATION_CONFIG_FILE: &str = "TransformationConfig.json";

#[derive(Debug, Clone)]
pub struct MappingCatalog {
    store: Arc<MappingStore>,
    resource_mapping_file: String,
    transformation_file: String,
}

/// One defect found by [`MappingCatalog::validate`].
#[derive(Debug)]
pub struct MappingProblem {
    pub resource_type: ResourceType,
    pub error: Error,
}

impl std::fmt::Display for MappingProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.resource_type, self.error)
    }
}

impl MappingCatalog {
    pub fn new(store: Arc<MappingStore>) -> Self {
        Self::with_file_names(store, RESOURCE_MAPPING_FILE, TRANSFORMATION_CONFIG_FILE)
    }

    pub fn with_file_names(
        store: Arc<MappingStore>,
        resource_mapping_file: impl Into<String>,
        transformation_file: impl Into<String>,
    ) -> Self {
        Self {
            store,
            resource_mapping_file: resource_mapping_file.into(),
            transformation_file: transformation_file.into(),
        }
    }

    pub fn store(&self) -> &MappingStore {
        &self.store
    }

    pub async fn resource_mapping(
        &self,
        resource_type: ResourceType,
    ) -> Result<ResourceMappingEntry> {
        let table = self.store.get(&self.resource_mapping_file).await?;
        let root = table.root();
        let prefix = format!("{RESOURCES}.{resource_type}");

        let node = resource_node(root, resource_type.as_str())?
            .ok_or_else(|| Error::UnknownResourceType(resource_type.to_string()))?;
        let node = node.as_object().ok_or_else(|| Error::FieldTypeMismatch {
            key: prefix.clone(),
            expected: "an object",
            found: kind_of(node),
        })?;

        let default_template = if root.contains_key(API_INFO) {
            as_opt_str(as_mapping(root, API_INFO)?, QUERY_SYNTAX)
                .map_err(|e| e.within(API_INFO))?
        } else {
            None
        };

        ResourceMappingEntry::from_node(node, default_template).map_err(|e| e.within(&prefix))
    }

    pub async fn transform_mapping(&self, resource_type: ResourceType) -> Result<TransformMapping> {
        let table = self.store.get(&self.transformation_file).await?;
        let prefix = format!("{RESOURCES}.{resource_type}");

        let value = resource_node(table.root(), resource_type.as_str())?
            .ok_or_else(|| Error::FieldMissing {
                key: prefix.clone(),
            })?;
        TransformMapping::from_value(value).map_err(|e| e.within(&prefix))
    }

    /// Checks that every listed type has usable, mutually consistent entries in
    /// both tables. Table load failures are returned as errors; per-type defects
    /// are collected.
    pub async fn validate(&self, resource_types: &[ResourceType]) -> Result<Vec<MappingProblem>> {
        self.store.get(&self.resource_mapping_file).await?;
        self.store.get(&self.transformation_file).await?;

        let mut problems = Vec::new();
        for &resource_type in resource_types {
            let resource = self.resource_mapping(resource_type).await;
            let transform = self.transform_mapping(resource_type).await;

            match (resource, transform) {
                (Ok(resource), Ok(transform)) => {
                    if let Err(error) = check_consistency(resource_type, &resource, &transform) {
                        problems.push(MappingProblem {
                            resource_type,
                            error,
                        });
                    }
                }
                (resource, transform) => {
                    for error in [resource.err(), transform.err()].into_iter().flatten() {
                        problems.push(MappingProblem {
                            resource_type,
                            error,
                        });
                    }
                }
            }
        }
        Ok(problems)
    }
}

fn check_consistency(
    resource_type: ResourceType,
    resource: &ResourceMappingEntry,
    transform: &TransformMapping,
) -> Result<()> {
    let inconsistent = |message: String| Error::Inconsistent {
        resource_type: resource_type.to_string(),
        message,
    };

    match (&resource.entity_names, transform) {
        (EntityNames::One(_), TransformMapping::OneToOne(_)) => Ok(()),
        (EntityNames::Many(names), TransformMapping::OneToMany(_)) => {
            for name in names {
                if transform.entry_for(Some(name)).is_none() {
                    return Err(inconsistent(format!(
                        "entity '{name}' has no transformation entry"
                    )));
                }
            }
            Ok(())
        }
        (EntityNames::One(_), TransformMapping::OneToMany(_)) => Err(inconsistent(
            "single entity name but a list of transformation entries".to_string(),
        )),
        (EntityNames::Many(_), TransformMapping::OneToOne(_)) => Err(inconsistent(
            "several entity names but a single transformation entry".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::StaticSource;
    use serde_json::json;

    fn catalog(
        resource_mapping: serde_json::Value,
        transformation: serde_json::Value,
    ) -> MappingCatalog {
        let source = StaticSource::new()
            .with_document(RESOURCE_MAPPING_FILE, resource_mapping.to_string())
            .with_document(TRANSFORMATION_CONFIG_FILE, transformation.to_string());
        MappingCatalog::new(Arc::new(MappingStore::new(Arc::new(source))))
    }

    fn allergy_transform() -> serde_json::Value {
        json!({
            "structureDefinition": "ArcadiaAllergy",
            "structureMap": "AllergyMap",
            "resourceProfileUrl": "allergy"
        })
    }

    #[tokio::test]
    async fn unknown_resource_type() {
        let catalog = catalog(
            json!({"apiInfo": {"querySyntax": "q"}, "resources": {}}),
            json!({"resources": {}}),
        );
        assert!(matches!(
            catalog.resource_mapping(ResourceType::Device).await,
            Err(Error::UnknownResourceType(t)) if t == "Device"
        ));
        assert!(matches!(
            catalog.transform_mapping(ResourceType::Device).await,
            Err(Error::FieldMissing { key }) if key == "resources.Device"
        ));
    }

    #[tokio::test]
    async fn field_errors_carry_the_resource_path() {
        let catalog = catalog(
            json!({
                "apiInfo": {"querySyntax": "q"},
                "resources": {"Device": {"arcadiaResourceName": 1}}
            }),
            json!({"resources": {"Device": {"structureDefinition": "D"}}}),
        );
        assert!(matches!(
            catalog.resource_mapping(ResourceType::Device).await,
            Err(Error::FieldTypeMismatch { key, .. })
                if key == "resources.Device.arcadiaResourceName"
        ));
        assert!(matches!(
            catalog.transform_mapping(ResourceType::Device).await,
            Err(Error::FieldMissing { key }) if key == "resources.Device.structureMap"
        ));
    }

    #[tokio::test]
    async fn missing_resources_section_is_a_field_error() {
        let catalog = catalog(json!({"apiInfo": {"querySyntax": "q"}}), json!({}));
        assert!(matches!(
            catalog.resource_mapping(ResourceType::Device).await,
            Err(Error::FieldMissing { key }) if key == "resources"
        ));
    }

    #[tokio::test]
    async fn validate_reports_every_defect() {
        let catalog = catalog(
            json!({
                "apiInfo": {"querySyntax": "q"},
                "resources": {
                    "AllergyIntolerance": {"arcadiaResourceName": "allergies"},
                    "Condition": {"arcadiaResourceName": ["problems", "diagnoses"]},
                    "Device": {"arcadiaResourceName": "devices"}
                }
            }),
            json!({
                "resources": {
                    "AllergyIntolerance": allergy_transform(),
                    "Condition": [
                        {
                            "arcadiaResourceName": "problems",
                            "structureDefinition": "P",
                            "structureMap": "PM",
                            "resourceProfileUrl": "pp"
                        }
                    ],
                    "Device": [
                        {
                            "arcadiaResourceName": "devices",
                            "structureDefinition": "D",
                            "structureMap": "DM",
                            "resourceProfileUrl": "dp"
                        }
                    ]
                }
            }),
        );

        let problems = catalog
            .validate(&[
                ResourceType::AllergyIntolerance,
                ResourceType::Condition,
                ResourceType::Device,
                ResourceType::Patient,
            ])
            .await
            .unwrap();

        let types: Vec<_> = problems.iter().map(|p| p.resource_type).collect();
        assert_eq!(
            types,
            vec![
                ResourceType::Condition,
                ResourceType::Device,
                ResourceType::Patient,
                ResourceType::Patient
            ]
        );
        assert!(problems[0].to_string().contains("diagnoses"));
    }

    #[tokio::test]
    async fn validate_fails_when_a_table_cannot_load() {
        let source = StaticSource::new().with_document(RESOURCE_MAPPING_FILE, "{}");
        let catalog = MappingCatalog::new(Arc::new(MappingStore::new(Arc::new(source))));
        assert!(matches!(
            catalog.validate(&ResourceType::ALL).await,
            Err(Error::ConfigLoad { .. })
        ));
    }
}
