//! OpenTelemetry span export over OTLP.
//!
//! Installs the same filter and console layer as [`crate::logging`] plus an
//! OpenTelemetry layer, so per-root orchestrator spans can be followed across
//! nodes in a tracing backend.

use opentelemetry::trace::TracerProvider;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{self, RandomIdGenerator, Sampler},
    Resource,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::logging::env_filter;
use crate::{TelemetryConfig, TelemetryError};

/// Shuts the tracer provider down on drop, flushing pending spans.
pub struct TracingGuard {
    provider: opentelemetry_sdk::trace::TracerProvider,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Err(e) = self.provider.shutdown() {
            eprintln!("tracer provider shutdown failed: {e:?}");
        }
    }
}

/// Install the global subscriber with OTLP export. Must run inside a tokio runtime.
pub async fn init_tracing(config: &TelemetryConfig) -> Result<TracingGuard, TelemetryError> {
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(&config.otlp_endpoint);

    let provider = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(
            trace::Config::default()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(Resource::new(vec![
                    KeyValue::new("service.name", config.instance_name()),
                    KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                    KeyValue::new("deployment.environment", config.network.clone()),
                    KeyValue::new("bm.node", config.node_label.clone().unwrap_or_default()),
                ])),
        )
        .install_batch(runtime::Tokio)
        .map_err(|e| TelemetryError::TracerInit(e.to_string()))?;

    let tracer = provider.tracer(config.instance_name());
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
    let filter = env_filter(config)?;

    let fmt_layer = config.console_output.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(otel_layer)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| TelemetryError::TracerInit(e.to_string()))?;

    tracing::info!(
        service = %config.instance_name(),
        otlp_endpoint = %config.otlp_endpoint,
        "[telemetry] OTLP span export initialized"
    );

    Ok(TracingGuard { provider })
}
