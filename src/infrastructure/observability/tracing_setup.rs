//! OpenTelemetry distributed tracing setup

use opentelemetry::{trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{RandomIdGenerator, Sampler, TracerProvider},
    Resource,
};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use tracing::Subscriber;

use super::config::TracingConfig;
use crate::config::{LogFormat, LoggingConfig};

/// Initialize tracing with optional OpenTelemetry export
///
/// An exporter that fails to build is reported and the service keeps
/// running with local logs only.
pub fn init_tracing(logging_config: &LoggingConfig, tracing_config: &TracingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging_config.level));

    let (provider, otel_error) = if tracing_config.enabled {
        match init_otel_tracing(tracing_config) {
            Ok(provider) => (Some(provider), None),
            Err(e) => (None, Some(e)),
        }
    } else {
        (None, None)
    };

    match logging_config.format {
        LogFormat::Json => json_subscriber(filter, provider.as_ref()).init(),
        LogFormat::Pretty => pretty_subscriber(filter, provider.as_ref()).init(),
    }

    match (provider, otel_error) {
        (Some(provider), _) => {
            opentelemetry::global::set_tracer_provider(provider);
            tracing::info!(
                "Tracing initialized with OpenTelemetry export to {}",
                tracing_config.otlp_endpoint
            );
        }
        (None, Some(e)) => {
            tracing::warn!("Failed to initialize OpenTelemetry: {}. Tracing disabled.", e);
        }
        (None, None) => tracing::info!("Tracing initialized (OpenTelemetry disabled)"),
    }
}

fn json_subscriber(
    filter: EnvFilter,
    provider: Option<&TracerProvider>,
) -> impl Subscriber + Send + Sync + use<> {
    let telemetry_layer =
        provider.map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("keygate")));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .json()
                .with_span_events(FmtSpan::CLOSE)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(telemetry_layer)
}

fn pretty_subscriber(
    filter: EnvFilter,
    provider: Option<&TracerProvider>,
) -> impl Subscriber + Send + Sync + use<> {
    let telemetry_layer =
        provider.map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("keygate")));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .pretty()
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE),
        )
        .with(telemetry_layer)
}

fn sampler(ratio: f64) -> Sampler {
    if ratio >= 1.0 {
        Sampler::AlwaysOn
    } else if ratio <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(ratio)
    }
}

fn init_otel_tracing(
    config: &TracingConfig,
) -> Result<TracerProvider, opentelemetry::trace::TraceError> {
    let resource = Resource::new(vec![KeyValue::new(
        "service.name",
        config.service_name.clone(),
    )]);

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()?;

    let provider = TracerProvider::builder()
        .with_sampler(sampler(config.sampling_ratio))
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource)
        .with_batch_exporter(exporter, runtime::Tokio)
        .build();

    Ok(provider)
}

/// Shutdown tracing and flush pending spans
pub fn shutdown_tracing() {
    opentelemetry::global::shutdown_tracer_provider();
    tracing::info!("Tracing shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_provider() -> TracerProvider {
        TracerProvider::builder().build()
    }

    #[test]
    fn test_json_subscriber_with_otel_layer() {
        let provider = local_provider();
        let subscriber = json_subscriber(EnvFilter::new("info"), Some(&provider));

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("verify");
            let _entered = span.enter();
            tracing::info!("inside span");
        });
    }

    #[test]
    fn test_pretty_subscriber_with_and_without_otel_layer() {
        let provider = local_provider();

        tracing::subscriber::with_default(
            pretty_subscriber(EnvFilter::new("debug"), Some(&provider)),
            || tracing::debug!("with exporter"),
        );
        tracing::subscriber::with_default(pretty_subscriber(EnvFilter::new("debug"), None), || {
            tracing::debug!("local only")
        });
    }

    #[test]
    fn test_sampler_bounds() {
        assert!(matches!(sampler(1.0), Sampler::AlwaysOn));
        assert!(matches!(sampler(2.5), Sampler::AlwaysOn));
        assert!(matches!(sampler(0.0), Sampler::AlwaysOff));
        assert!(matches!(sampler(0.5), Sampler::TraceIdRatioBased(r) if r == 0.5));
    }
}
