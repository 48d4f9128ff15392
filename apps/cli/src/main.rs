use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as AnyhowContext, Result};
use arcadia_fhir::logging;
use arcadia_fhir::resolver::{plan_query, BackendRequest};
use arcadia_mapping::{
    DirectorySource, MappingCatalog, MappingStore, RESOURCE_MAPPING_FILE,
    TRANSFORMATION_CONFIG_FILE,
};
use arcadia_models::{ResourceType, SearchParameters};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::json;

#[derive(Parser)]
#[command(
    name = "arcadia",
    about = "Command line tools for the Arcadia FHIR facade",
    version,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct MappingArgs {
    /// Directory holding the mapping tables.
    #[arg(short, long, value_name = "DIR", default_value = "./mappings")]
    dir: PathBuf,
    /// Resource mapping file name inside DIR.
    #[arg(long, default_value = RESOURCE_MAPPING_FILE)]
    resource_mapping_file: String,
    /// Transformation config file name inside DIR.
    #[arg(long, default_value = TRANSFORMATION_CONFIG_FILE)]
    transformation_file: String,
}

impl MappingArgs {
    fn catalog(&self) -> MappingCatalog {
        let source = DirectorySource::new(self.dir.clone());
        MappingCatalog::with_file_names(
            Arc::new(MappingStore::new(Arc::new(source))),
            self.resource_mapping_file.clone(),
            self.transformation_file.clone(),
        )
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check that every served resource type has consistent mappings.
    CheckMappings {
        #[command(flatten)]
        mappings: MappingArgs,
    },

    /// Print the backend request a search would send, without sending it.
    RenderQuery {
        /// FHIR resource type (e.g. AllergyIntolerance).
        resource_type: String,
        /// Search parameter as NAME=VALUE. Repeatable.
        #[arg(short = 'p', long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,
        /// Print the request as JSON.
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
        #[command(flatten)]
        mappings: MappingArgs,
    },

    /// Print CLI version.
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_simple_logging();

    match cli.command {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::CheckMappings { mappings } => check_mappings(&mappings).await?,
        Commands::RenderQuery {
            resource_type,
            params,
            json,
            mappings,
        } => render_query(&resource_type, &params, json, &mappings).await?,
    }

    Ok(())
}

async fn check_mappings(args: &MappingArgs) -> Result<()> {
    let problems = args
        .catalog()
        .validate(&ResourceType::ALL)
        .await
        .with_context(|| format!("Failed to load mapping tables from {}", args.dir.display()))?;

    if problems.is_empty() {
        println!("ok: {} resource types mapped", ResourceType::ALL.len());
        return Ok(());
    }

    for problem in &problems {
        println!("{problem}");
    }
    anyhow::bail!("{} mapping problem(s) found", problems.len())
}

async fn render_query(
    resource_type: &str,
    raw_params: &[String],
    as_json: bool,
    args: &MappingArgs,
) -> Result<()> {
    let resource_type: ResourceType = resource_type.parse()?;
    let items = raw_params
        .iter()
        .map(|raw| parse_param(raw))
        .collect::<Result<Vec<_>>>()?;
    let params = SearchParameters::from_items(&items)?;

    let entry = args.catalog().resource_mapping(resource_type).await?;
    let request = plan_query(&entry, &params)?;
    tracing::debug!(%resource_type, ?request, "Planned request");

    let (mode, text) = match &request {
        BackendRequest::GraphQl(query) => ("graphql", query),
        BackendRequest::PersonSearch(query_string) => ("personSearch", query_string),
    };

    if as_json {
        let out = json!({"resourceType": resource_type.as_str(), "mode": mode, "request": text});
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{text}");
    }
    Ok(())
}

fn parse_param(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .with_context(|| format!("Expected NAME=VALUE, got '{raw}'"))?;
    Ok((name.trim().to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_param_splits_on_first_equals() {
        assert_eq!(
            parse_param("identifier=MR|1=2").unwrap(),
            ("identifier".to_string(), "MR|1=2".to_string())
        );
        assert!(parse_param("patient").is_err());
    }

    #[test]
    fn cli_parses_repeated_params() {
        let cli = Cli::try_parse_from([
            "arcadia",
            "render-query",
            "Observation",
            "-p",
            "patient=1",
            "--param",
            "_revinclude=Provenance:target",
            "--dir",
            "mappings",
        ])
        .unwrap();
        let Commands::RenderQuery { params, mappings, .. } = cli.command else {
            panic!("expected render-query");
        };
        assert_eq!(params.len(), 2);
        assert_eq!(mappings.dir, PathBuf::from("mappings"));
    }
}
