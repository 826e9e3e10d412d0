//! Tracing bootstrap shared by the CRM binaries.

use anyhow::{Result, anyhow};
use once_cell::sync::OnceCell;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{self as sdk, Resource};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INSTALLED: OnceCell<()> = OnceCell::new();

const DEFAULT_FILTER: &str = "info,tower_http=warn";

/// Telemetry settings for one process.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    pub service_name: &'static str,
    /// Overrides `RUST_LOG`; falls back to [`DEFAULT_FILTER`] when neither is
    /// set.
    pub log_filter: Option<String>,
    /// OTLP endpoint; spans are exported only when one is configured here or
    /// via `OTLP_ENDPOINT`.
    pub otlp_endpoint: Option<String>,
}

impl TelemetryConfig {
    pub fn for_service(service_name: &'static str) -> Self {
        Self {
            service_name,
            log_filter: None,
            otlp_endpoint: None,
        }
    }
}

/// Install the process-wide subscriber stack. A second call is a no-op so
/// tests and embedded uses can both initialize freely.
pub fn init_telemetry(config: TelemetryConfig) -> Result<()> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }

    let filter = config
        .log_filter
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string());
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_new(filter)?)
        .with(tracing_subscriber::fmt::layer().with_target(false));

    let endpoint = config
        .otlp_endpoint
        .or_else(|| std::env::var("OTLP_ENDPOINT").ok());
    match endpoint {
        Some(endpoint) => {
            let exporter = SpanExporter::builder()
                .with_http()
                .with_protocol(Protocol::HttpBinary)
                .with_endpoint(endpoint)
                .build()?;
            let provider = sdk::trace::SdkTracerProvider::builder()
                .with_resource(
                    Resource::builder()
                        .with_service_name(config.service_name)
                        .build(),
                )
                .with_batch_exporter(exporter)
                .build();
            let tracer = provider.tracer(config.service_name);
            registry
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .try_init()?;
        }
        None => registry.try_init()?,
    }

    INSTALLED
        .set(())
        .map_err(|_| anyhow!("telemetry already installed"))?;
    Ok(())
}
