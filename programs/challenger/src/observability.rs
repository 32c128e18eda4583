//! Process-wide logging: formatted events on stdout, plus span export over
//! OTLP when `log.use_otel` is set.

use anyhow::{Context, Result};
use challenger_executor::config::LogConfig;
use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    resource::Resource,
    trace::{Sampler, SdkTracerProvider, Tracer},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Flushes and stops span export when dropped. Hold it until `main` returns.
pub struct ObservabilityGuard {
    otel_provider: Option<SdkTracerProvider>,
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.otel_provider.take() {
            let _ = provider.shutdown();
        }
    }
}

/// `RUST_LOG` when set, the configured level otherwise.
fn env_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level().as_str().to_lowercase()))
}

/// Installs the global subscriber.
///
/// An exporter that cannot be built only disables span export; the challenger
/// still logs to stdout.
///
/// # Errors
/// Fails when a global subscriber is already installed.
pub fn init_observability(config: &LogConfig) -> Result<ObservabilityGuard> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let (tracer, otel_provider) = match config.use_otel.then(|| otlp_tracer(config)) {
        Some(Ok((tracer, provider))) => (Some(tracer), Some(provider)),
        Some(Err(e)) => {
            eprintln!("span export disabled: {e:#}");
            (None, None)
        }
        None => (None, None),
    };

    Registry::default()
        .with(env_filter(config))
        .with(fmt::layer().with_target(true).with_line_number(true))
        .with(tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer)))
        .try_init()
        .context("logging is already initialised")?;

    Ok(ObservabilityGuard { otel_provider })
}

/// Tracer batching spans to the configured OTLP gRPC collector, or to the
/// exporter's default endpoint when none is set.
fn otlp_tracer(config: &LogConfig) -> Result<(Tracer, SdkTracerProvider)> {
    let mut exporter = opentelemetry_otlp::SpanExporter::builder().with_tonic();
    if let Some(endpoint) = &config.otel_endpoint {
        exporter = exporter.with_endpoint(endpoint);
    }
    let exporter = exporter.build().context("building the OTLP exporter")?;

    let provider = SdkTracerProvider::builder()
        .with_resource(
            Resource::builder()
                .with_attributes([
                    KeyValue::new("service.name", config.service_name.clone()),
                    KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                ])
                .build(),
        )
        .with_sampler(Sampler::AlwaysOn)
        .with_batch_exporter(exporter)
        .build();

    Ok((provider.tracer(config.service_name.clone()), provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tracer_builds_for_configured_collector() {
        let config = LogConfig {
            use_otel: true,
            otel_endpoint: Some("http://127.0.0.1:4317".to_string()),
            ..LogConfig::default()
        };

        assert!(otlp_tracer(&config).is_ok());
    }

    #[tokio::test]
    async fn subscriber_installs_only_once() {
        let config = LogConfig::default();

        assert!(init_observability(&config).is_ok());
        assert!(init_observability(&config).is_err());
    }
}
