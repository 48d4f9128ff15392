//! Tracing setup for the `fhir-server` binary and the `arcadia` CLI
//!
//! The server builds its subscriber from [`LoggingConfig`]: an `EnvFilter`
//! (`RUST_LOG` wins over `logging.level`), a stdout formatter, an optional
//! rolling log file and an optional OTLP span exporter. Each search produces
//! one `http_request` span with the backend, transform and validation calls
//! nested under it.

use crate::config::LoggingConfig;
use anyhow::Context;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{Config as TraceConfig, Sampler, TracerProvider};
use opentelemetry_sdk::Resource;
use std::time::Duration;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

const TRACER_NAME: &str = "arcadia-fhir";

/// Targets logged at `logging.level`; `fhir_server` is the binary itself.
const FACADE_TARGETS: &[&str] = &[
    "fhir_server",
    "arcadia_fhir",
    "arcadia_client",
    "arcadia_mapping",
];

const PLUMBING_DIRECTIVES: &[&str] = &["tower_http=info", "hyper=warn", "reqwest=warn"];

type FilteredRegistry = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<FilteredRegistry> + Send + Sync>;

/// Keep alive for the life of the process. Dropping it flushes the log file
/// writer and, when spans are exported, the OTLP pipeline.
pub struct TelemetryGuard {
    _file_guard: Option<WorkerGuard>,
    exporting: bool,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if self.exporting {
            shutdown_telemetry();
        }
    }
}

/// Installs the global subscriber described by `config`.
///
/// A failure to build the OTLP exporter is not fatal: logging comes up
/// without span export and the failure is reported as a warning.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<TelemetryGuard> {
    let mut layers: Vec<BoxedLayer> = vec![console_layer(config)];

    let file_guard = if config.file_enabled {
        let (writer, guard) = tracing_appender::non_blocking(file_appender(config)?);
        layers.push(file_layer(config, writer));
        Some(guard)
    } else {
        None
    };

    let (provider, otel_error) = if config.opentelemetry_enabled {
        match tracer_provider(config) {
            Ok(provider) => (Some(provider), None),
            Err(e) => (None, Some(e)),
        }
    } else {
        (None, None)
    };
    if let Some(provider) = &provider {
        layers.push(
            tracing_opentelemetry::layer()
                .with_tracer(provider.tracer(TRACER_NAME))
                .with_tracked_inactivity(true)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(layers)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    let exporting = provider.is_some();
    if let Some(provider) = provider {
        global::set_tracer_provider(provider);
    }
    if let Some(err) = otel_error {
        tracing::warn!(
            error = %err,
            endpoint = %config.otlp_endpoint,
            "Spans will not be exported"
        );
    }

    tracing::info!(
        json = config.json,
        file = config.file_enabled,
        otlp = exporting,
        service_name = %config.service_name,
        environment = %config.deployment_environment,
        "Logging initialized"
    );

    Ok(TelemetryGuard {
        _file_guard: file_guard,
        exporting,
    })
}

/// Flushes and stops the global tracer provider.
pub fn shutdown_telemetry() {
    global::shutdown_tracer_provider();
}

/// Stderr-only logging for the CLI, so stdout carries nothing but command output.
pub fn init_simple_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("arcadia=info,arcadia_fhir=info,arcadia_mapping=info,arcadia_client=warn")
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

fn default_directives(level: &str) -> String {
    FACADE_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .chain(PLUMBING_DIRECTIVES.iter().map(|d| d.to_string()))
        .collect::<Vec<_>>()
        .join(",")
}

fn console_layer(config: &LoggingConfig) -> BoxedLayer {
    let layer = fmt::layer().with_writer(std::io::stdout);
    if config.json {
        layer
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed()
    } else {
        layer.with_target(true).boxed()
    }
}

fn file_layer(config: &LoggingConfig, writer: NonBlocking) -> BoxedLayer {
    let layer = fmt::layer().with_ansi(false).with_writer(writer);
    if config.json {
        layer
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed()
    } else {
        layer.with_target(true).boxed()
    }
}

/// Rotation is one of daily, hourly, minutely or never; anything else is daily.
fn file_appender(config: &LoggingConfig) -> anyhow::Result<RollingFileAppender> {
    let dir = &config.file_directory;
    let prefix = &config.file_prefix;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {dir}"))?;

    Ok(match config.file_rotation.as_str() {
        "hourly" => rolling::hourly(dir, prefix),
        "minutely" => rolling::minutely(dir, prefix),
        "never" => rolling::never(dir, format!("{prefix}.log")),
        _ => rolling::daily(dir, prefix),
    })
}

fn tracer_provider(config: &LoggingConfig) -> anyhow::Result<TracerProvider> {
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(&config.otlp_endpoint)
        .with_timeout(Duration::from_secs(config.otlp_timeout_seconds))
        .build_span_exporter()
        .context("Failed to create OTLP span exporter")?;

    let trace_config = TraceConfig::default()
        .with_sampler(sampler(config.trace_sample_ratio))
        .with_resource(resource(config));

    Ok(TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_config(trace_config)
        .build())
}

/// Ratios outside (0, 1) collapse to always-off / always-on; anything in
/// between follows the parent decision first.
fn sampler(ratio: f64) -> Sampler {
    match ratio {
        r if r >= 1.0 => Sampler::AlwaysOn,
        r if r <= 0.0 => Sampler::AlwaysOff,
        r => Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(r))),
    }
}

fn resource(config: &LoggingConfig) -> Resource {
    let version = config
        .service_version
        .clone()
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    Resource::new([
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("service.version", version),
        KeyValue::new(
            "deployment.environment",
            config.deployment_environment.clone(),
        ),
    ])
}
