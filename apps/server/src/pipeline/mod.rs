//! Transform, validate and assemble backend records
//!
//! For every record of a [`ResolvedResourceSet`], strictly in order:
//! normalize date fields, tag the record with its structure definition,
//! transform it remotely, validate the result remotely and keep it only when
//! validation reports no error or fatal issue. With
//! `_revinclude=Provenance:target` each record also yields a Provenance,
//! produced and validated the same way and kept or dropped independently of
//! the primary resource.

pub mod dates;

use crate::metrics::{RemoteCallTimer, RESOURCES_DROPPED_TOTAL};
use crate::resolver::ResolvedResourceSet;
use crate::{Error, Result};
use arcadia_client::{TransformService, ValidationService};
use arcadia_mapping::{MappingCatalog, ProvenanceMapping, TransformMappingEntry};
use arcadia_models::{
    BundleEntrySearchMode, IssueType, OutcomeIssue, ResourceType, SearchParameters,
};
use serde_json::{Map, Value};
use std::sync::Arc;

/// The only reverse include the facade answers.
pub const PROVENANCE_TARGET: &str = "Provenance:target";

const RESOURCE_TYPE: &str = "resourceType";

/// A resource ready for the Bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledResource {
    pub resource: Value,
    /// `Match` for primary resources, `Include` for Provenance
    pub mode: BundleEntrySearchMode,
}

/// True iff the reverse includes are exactly `Provenance:target`.
pub fn wants_provenance(params: &SearchParameters) -> bool {
    matches!(params.rev_includes(), [only] if only == PROVENANCE_TARGET)
}

pub struct Pipeline {
    catalog: MappingCatalog,
    transform: Arc<dyn TransformService>,
    validation: Arc<dyn ValidationService>,
}

/// Mapping settings resolved for one group before any record is processed.
struct GroupPlan<'a> {
    entry: &'a TransformMappingEntry,
    provenance: Option<ProvenanceMapping<'a>>,
}

impl Pipeline {
    pub fn new(
        catalog: MappingCatalog,
        transform: Arc<dyn TransformService>,
        validation: Arc<dyn ValidationService>,
    ) -> Self {
        Self {
            catalog,
            transform,
            validation,
        }
    }

    /// Runs the pipeline over a resolved set. The set is not modified; each
    /// record is copied before it is annotated.
    #[tracing::instrument(name = "assemble", skip_all, fields(resource_type = %resource_type))]
    pub async fn run(
        &self,
        resource_type: ResourceType,
        resolved: &ResolvedResourceSet,
        params: &SearchParameters,
    ) -> Result<Vec<AssembledResource>> {
        let mapping = self.catalog.transform_mapping(resource_type).await?;
        let include_provenance = wants_provenance(params);
        let groups = resolved.groups();

        // Configuration problems fail the request before the first remote call.
        let plans = groups
            .iter()
            .map(|(entity_name, _)| {
                let prefix = match entity_name {
                    Some(name) => format!("resources.{resource_type}[{name}]"),
                    None => format!("resources.{resource_type}"),
                };
                let entry = mapping
                    .entry_for(*entity_name)
                    .ok_or_else(|| Error::ConfigFieldMissing {
                        key: prefix.clone(),
                    })?;
                let provenance = if include_provenance {
                    Some(entry.provenance().map_err(|e| e.within(&prefix))?)
                } else {
                    None
                };
                Ok(GroupPlan { entry, provenance })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut output = Vec::new();
        for ((_, records), plan) in groups.iter().zip(&plans) {
            for record in records.iter() {
                self.process_record(resource_type, record, plan, &mut output)
                    .await?;
            }
        }

        tracing::info!(
            records = resolved.record_count(),
            resources = output.len(),
            include_provenance,
            "Assembled resources"
        );
        Ok(output)
    }

    async fn process_record(
        &self,
        resource_type: ResourceType,
        record: &Value,
        plan: &GroupPlan<'_>,
        output: &mut Vec<AssembledResource>,
    ) -> Result<()> {
        let mut record: Map<String, Value> = record.as_object().cloned().ok_or_else(|| {
            Error::BackendUnavailable("backend record is not an object".to_string())
        })?;
        let entry = plan.entry;

        dates::normalize_fields(&mut record, &entry.date_fields);
        record.insert(
            RESOURCE_TYPE.to_string(),
            Value::String(entry.structure_definition.clone()),
        );

        if let Some(resource) = self
            .transform_and_validate(
                resource_type.as_str(),
                &entry.structure_map,
                &entry.resource_profile_url,
                &record,
            )
            .await?
        {
            output.push(AssembledResource {
                resource,
                mode: BundleEntrySearchMode::Match,
            });
        }

        // Provenance is judged on its own, even when the primary was dropped.
        if let Some(provenance) = plan.provenance {
            record.insert(
                RESOURCE_TYPE.to_string(),
                Value::String(provenance.structure_definition.to_string()),
            );
            if let Some(resource) = self
                .transform_and_validate(
                    ResourceType::Provenance.as_str(),
                    provenance.structure_map,
                    provenance.profile_url,
                    &record,
                )
                .await?
            {
                output.push(AssembledResource {
                    resource,
                    mode: BundleEntrySearchMode::Include,
                });
            }
        }
        Ok(())
    }

    /// `Ok(None)` when validation rejects the transformed resource.
    async fn transform_and_validate(
        &self,
        label: &str,
        structure_map: &str,
        profile_url: &str,
        record: &Map<String, Value>,
    ) -> Result<Option<Value>> {
        let record = Value::Object(record.clone());
        let text = {
            let _timer = RemoteCallTimer::start("transform");
            self.transform
                .transform(structure_map, &record)
                .await
                .map_err(Error::transform)?
        };

        let outcome = {
            let _timer = RemoteCallTimer::start("validation");
            self.validation
                .validate(profile_url, &text)
                .await
                .map_err(Error::validation)?
        };

        if outcome.has_blocking_issues() {
            let diagnostics: Vec<&str> = outcome
                .blocking_issues()
                .filter_map(|i| i.diagnostics.as_deref())
                .collect();
            tracing::info!(
                resource_type = label,
                record_id = ?record.get("id"),
                ?diagnostics,
                "Dropping resource that failed validation"
            );
            RESOURCES_DROPPED_TOTAL.with_label_values(&[label]).inc();
            return Ok(None);
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(resource @ Value::Object(_)) => Ok(Some(resource)),
            _ => Err(Error::TransformationFailed {
                issues: vec![OutcomeIssue::error(
                    IssueType::Processing,
                    format!("transformation of {label} did not produce a JSON object"),
                )],
            }),
        }
    }
}
