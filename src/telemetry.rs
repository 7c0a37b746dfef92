//! Logging, metrics export and trace export.
//!
//! Logging always goes through a `tracing-subscriber` registry filtered by
//! `RUST_LOG` (or `telemetry.log_level` when unset). With the `prometheus`
//! feature a scrape endpoint is started; with `otel` spans are also shipped
//! to an OTLP collector.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;

#[cfg(feature = "otel")]
static TRACER_PROVIDER: std::sync::OnceLock<opentelemetry_sdk::trace::SdkTracerProvider> =
    std::sync::OnceLock::new();

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Install the global subscriber and optional exporters.
pub fn init(config: &TelemetryConfig) -> Result<(), BoxError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer());

    #[cfg(feature = "otel")]
    let registry = registry.with(otel_layer(config)?);

    registry.try_init()?;

    #[cfg(feature = "otel")]
    if let Some(ref otel) = config.opentelemetry {
        tracing::info!(endpoint = %otel.endpoint, "OpenTelemetry tracing enabled");
    }

    #[cfg(feature = "prometheus")]
    if let Some(addr) = config.prometheus_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        tracing::info!(%addr, "Prometheus metrics exporter started");
    }

    Ok(())
}

/// Build the OTLP layer when an endpoint is configured.
#[cfg(feature = "otel")]
fn otel_layer<S>(
    config: &TelemetryConfig,
) -> Result<
    Option<tracing_opentelemetry::OpenTelemetryLayer<S, opentelemetry_sdk::trace::Tracer>>,
    BoxError,
>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    use opentelemetry::trace::TracerProvider;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};

    let Some(ref otel) = config.opentelemetry else {
        return Ok(None);
    };

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&otel.endpoint)
        .build()?;

    let resource = opentelemetry_sdk::Resource::builder()
        .with_attributes([
            KeyValue::new(SERVICE_NAME, otel.service_name.clone()),
            KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
        ])
        .build();

    let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build();
    let tracer = provider.tracer("registry-dns");
    let _ = TRACER_PROVIDER.set(provider);

    Ok(Some(tracing_opentelemetry::layer().with_tracer(tracer)))
}

/// Flush pending spans.
pub fn shutdown() {
    #[cfg(feature = "otel")]
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            tracing::warn!("Error shutting down tracer provider: {}", e);
        }
    }
}
