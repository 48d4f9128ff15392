//! Configuration management for the Arcadia FHIR facade

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub backend: BackendConfig,
    pub transform: ServiceConfig,
    pub validation: ServiceConfig,
    pub mapping: MappingConfig,
    #[serde(default)]
    pub demo: DemoConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Maximum request body size in bytes (POST _search forms). Default: 1 MB
    #[serde(default = "default_max_request_body_size")]
    pub max_request_body_size: usize,
    /// Public FHIR base URL used in Bundle links. Derived from request headers when unset.
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppMode {
    /// Query the Arcadia backend.
    Live,
    /// Serve backend payloads from local JSON files.
    Demo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_mode")]
    pub mode: AppMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    /// Port of the CRUD (GraphQL) service, appended to `base_url` when set.
    pub crud_port: Option<u16>,
    /// Port of the person search service, appended to `base_url` when set.
    pub search_port: Option<u16>,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Remote transformation or validation service.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MappingConfig {
    #[serde(default = "default_mapping_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_resource_mapping_file")]
    pub resource_mapping_file: String,
    #[serde(default = "default_transformation_file")]
    pub transformation_file: String,
    /// Check every resource type against both tables before serving.
    #[serde(default = "default_true")]
    pub validate_on_startup: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DemoConfig {
    /// Folder holding `<resource type path>.json` payloads.
    pub resource_folder: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON formatting for logs (recommended for production)
    #[serde(default)]
    pub json: bool,

    /// Enable file logging in addition to console
    #[serde(default)]
    pub file_enabled: bool,

    #[serde(default = "default_log_directory")]
    pub file_directory: String,

    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,

    /// Log rotation: daily, hourly, minutely, never (default: daily)
    #[serde(default = "default_log_rotation")]
    pub file_rotation: String,

    #[serde(default)]
    pub opentelemetry_enabled: bool,

    /// OpenTelemetry Collector endpoint (OTLP/gRPC)
    #[serde(default = "default_otlp_endpoint")]
    pub otlp_endpoint: String,

    /// Trace sampling ratio (0.0 - 1.0)
    #[serde(default = "default_trace_sample_ratio")]
    pub trace_sample_ratio: f64,

    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Deployment environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub deployment_environment: String,

    /// Service version (defaults to cargo package version)
    pub service_version: Option<String>,

    #[serde(default = "default_otlp_timeout")]
    pub otlp_timeout_seconds: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            file_enabled: false,
            file_directory: default_log_directory(),
            file_prefix: default_log_file_prefix(),
            file_rotation: default_log_rotation(),
            opentelemetry_enabled: false,
            otlp_endpoint: default_otlp_endpoint(),
            trace_sample_ratio: default_trace_sample_ratio(),
            service_name: default_service_name(),
            deployment_environment: default_environment(),
            service_version: None,
            otlp_timeout_seconds: default_otlp_timeout(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                cors_origins: Vec::new(),
                max_request_body_size: default_max_request_body_size(),
                base_url: None,
            },
            app: AppConfig {
                mode: default_mode(),
            },
            backend: BackendConfig {
                base_url: default_backend_url(),
                crud_port: None,
                search_port: None,
                auth_token: String::new(),
                timeout_seconds: default_http_timeout(),
            },
            transform: ServiceConfig {
                url: default_transform_url(),
                timeout_seconds: default_http_timeout(),
            },
            validation: ServiceConfig {
                url: default_validation_url(),
                timeout_seconds: default_http_timeout(),
            },
            mapping: MappingConfig {
                directory: default_mapping_directory(),
                resource_mapping_file: default_resource_mapping_file(),
                transformation_file: default_transformation_file(),
                validate_on_startup: default_true(),
            },
            demo: DemoConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_request_body_size() -> usize {
    1024 * 1024
}

fn default_mode() -> AppMode {
    AppMode::Live
}

fn default_backend_url() -> String {
    "http://localhost".to_string()
}

fn default_transform_url() -> String {
    "http://localhost:8090/StructureMap/".to_string()
}

fn default_validation_url() -> String {
    "http://localhost:8091/validate/".to_string()
}

fn default_http_timeout() -> u64 {
    30
}

fn default_mapping_directory() -> PathBuf {
    PathBuf::from("./mappings")
}

fn default_resource_mapping_file() -> String {
    arcadia_mapping::RESOURCE_MAPPING_FILE.to_string()
}

fn default_transformation_file() -> String {
    arcadia_mapping::TRANSFORMATION_CONFIG_FILE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_directory() -> String {
    "./logs".to_string()
}

fn default_log_file_prefix() -> String {
    "arcadia-fhir".to_string()
}

fn default_log_rotation() -> String {
    "daily".to_string()
}

fn default_otlp_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_trace_sample_ratio() -> f64 {
    1.0
}

fn default_service_name() -> String {
    "arcadia-fhir".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_otlp_timeout() -> u64 {
    10
}

impl Config {
    /// Load configuration from environment and config files
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("server.cors_origins", Vec::<String>::new())?
            .set_default(
                "server.max_request_body_size",
                default_max_request_body_size() as i64,
            )?
            .set_default("app.mode", "live")?
            .set_default("backend.base_url", default_backend_url())?
            .set_default("backend.auth_token", "")?
            .set_default("backend.timeout_seconds", default_http_timeout() as i64)?
            .set_default("transform.url", default_transform_url())?
            .set_default("transform.timeout_seconds", default_http_timeout() as i64)?
            .set_default("validation.url", default_validation_url())?
            .set_default("validation.timeout_seconds", default_http_timeout() as i64)?
            .set_default("mapping.directory", "./mappings")?
            .set_default("mapping.resource_mapping_file", default_resource_mapping_file())?
            .set_default("mapping.transformation_file", default_transformation_file())?
            .set_default("mapping.validate_on_startup", default_true())?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.json", false)?
            .set_default("logging.file_enabled", false)?
            .set_default("logging.file_directory", default_log_directory())?
            .set_default("logging.file_prefix", default_log_file_prefix())?
            .set_default("logging.file_rotation", default_log_rotation())?
            .set_default("logging.opentelemetry_enabled", false)?
            .set_default("logging.otlp_endpoint", default_otlp_endpoint())?
            .set_default("logging.trace_sample_ratio", default_trace_sample_ratio())?
            .set_default("logging.service_name", default_service_name())?
            .set_default("logging.deployment_environment", default_environment())?
            .set_default("logging.otlp_timeout_seconds", default_otlp_timeout() as i64)?
            // Add config file if exists
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables
            // Example: ARCADIA__BACKEND__AUTH_TOKEN -> config.backend.auth_token
            // Arrays use comma separator: ARCADIA__SERVER__CORS_ORIGINS=https://a.com,https://b.com
            .add_source(
                config::Environment::with_prefix("ARCADIA")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        Ok(addr.parse()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.mode() == AppMode::Live {
            if self.backend.base_url.trim().is_empty() {
                return Err("backend.base_url must be set in live mode".to_string());
            }
            if self.backend.timeout_seconds == 0 {
                return Err("backend.timeout_seconds must be > 0".to_string());
            }
        }

        for (name, service) in [("transform", &self.transform), ("validation", &self.validation)] {
            if service.url.trim().is_empty() {
                return Err(format!("{name}.url must be set"));
            }
            if service.timeout_seconds == 0 {
                return Err(format!("{name}.timeout_seconds must be > 0"));
            }
        }

        if self.mode() == AppMode::Demo && self.demo.resource_folder.is_none() {
            return Err("demo.resource_folder must be set when app.mode=demo".to_string());
        }

        if !(0.0..=1.0).contains(&self.logging.trace_sample_ratio) {
            return Err("logging.trace_sample_ratio must be between 0.0 and 1.0".to_string());
        }

        Ok(())
    }

    pub fn mode(&self) -> AppMode {
        self.app.mode
    }
}
