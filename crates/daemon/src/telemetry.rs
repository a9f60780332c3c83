//! Logging and optional OpenTelemetry export
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directives (default: `contentforge=info`)
//! - `CONTENTFORGE_LOG_FORMAT`: `pretty` (default) or `json`
//! - `CONTENTFORGE_LOG_DIR`: also write daily rolling JSON files here
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (e.g. http://localhost:4317),
//!   honored only when built with the `telemetry` feature
//! - `OTEL_SERVICE_NAME`: service name (default: contentforge-daemon)

use crate::config::Settings;
use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "contentforge=info";
const LOG_FILE_PREFIX: &str = "contentforge.log";
const OTLP_ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

/// Keeps background log writers alive; drop it last.
pub struct TelemetryGuard {
    _file_writer: Option<WorkerGuard>,
    #[cfg(feature = "telemetry")]
    tracer_provider: Option<opentelemetry_sdk::trace::TracerProvider>,
}

#[cfg(feature = "telemetry")]
impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("OpenTelemetry shutdown failed: {e}");
            }
        }
    }
}

pub fn init(settings: &Settings) -> Result<TelemetryGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

    let (pretty, json) = if settings.log_format.eq_ignore_ascii_case("json") {
        (None, Some(fmt::layer().json()))
    } else {
        (Some(fmt::layer().pretty()), None)
    };

    let (file, file_writer) = match settings.log_dir() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(pretty)
        .with(json)
        .with(file);

    #[cfg(feature = "telemetry")]
    let tracer_provider = {
        let (otel, provider) = match otlp_endpoint() {
            Some(endpoint) => {
                let (layer, provider) = otel_layer(&endpoint)?;
                (Some(layer), Some(provider))
            }
            None => (None, None),
        };
        registry.with(otel).try_init()?;
        provider
    };

    #[cfg(not(feature = "telemetry"))]
    {
        registry.try_init()?;
        if otlp_endpoint().is_some() {
            tracing::warn!("OTLP endpoint set but the 'telemetry' feature is not enabled");
        }
    }

    Ok(TelemetryGuard {
        _file_writer: file_writer,
        #[cfg(feature = "telemetry")]
        tracer_provider,
    })
}

fn otlp_endpoint() -> Option<String> {
    std::env::var(OTLP_ENDPOINT_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty())
}

#[cfg(feature = "telemetry")]
fn otel_layer<S>(
    endpoint: &str,
) -> Result<(
    tracing_opentelemetry::OpenTelemetryLayer<S, opentelemetry_sdk::trace::Tracer>,
    opentelemetry_sdk::trace::TracerProvider,
)>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::Resource;

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "contentforge-daemon".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    let provider = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            service_name.clone(),
        )]))
        .build();
    opentelemetry::global::set_tracer_provider(provider.clone());

    let tracer = provider.tracer(service_name);
    Ok((tracing_opentelemetry::layer().with_tracer(tracer), provider))
}
