//! # Blockmania Telemetry
//!
//! Logging, span export, and Prometheus metrics shared by every subsystem.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bm_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env()).await?;
//! // hold the guard for the lifetime of the node
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BM_LOG_LEVEL` | `info` | Log level filter |
//! | `BM_JSON_LOGS` | `false` | JSON log lines |
//! | `BM_METRICS_PORT` | `9100` | Prometheus port |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | `http://localhost:4317` | Span export (feature `otlp`) |

mod config;
mod logging;
pub mod metrics;
#[cfg(feature = "otlp")]
mod tracing_setup;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, DUPLICATE_DELIVERIES, ENGINE_APPENDS,
    FRAGMENTS_REJECTED, GOSSIP_PUSHES, GOSSIP_PUSH_DURATION, GRAPHS_STORED, INTERPRETED_BATCHES,
    JOB_TRANSITIONS, LIVE_ORCHESTRATORS, PENDING_DELIVERIES, QUORUM_REACHED, REDELIVERIES,
};
#[cfg(feature = "otlp")]
pub use tracing_setup::TracingGuard;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("tracer setup failed: {0}")]
    TracerInit(String),

    #[error("subscriber already installed or invalid: {0}")]
    LoggingInit(String),

    #[error("metric registration failed: {0}")]
    MetricsInit(String),

    #[error("bad log filter: {0}")]
    Config(String),
}

/// Initialize logging (and span export with `otlp`) plus the metrics registry.
///
/// Returns a guard that must be held for the lifetime of the node.
pub async fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics_handle = register_metrics()?;

    #[cfg(feature = "otlp")]
    let tracing_guard = tracing_setup::init_tracing(&config).await?;
    #[cfg(not(feature = "otlp"))]
    logging::init_logging(&config)?;

    Ok(TelemetryGuard {
        #[cfg(feature = "otlp")]
        _tracing: tracing_guard,
        _metrics: metrics_handle,
    })
}

/// Keeps telemetry active. Drop to flush and shut down.
pub struct TelemetryGuard {
    #[cfg(feature = "otlp")]
    _tracing: TracingGuard,
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("[telemetry] Shutting down");
    }
}

/// Span covering the lifetime of one root's orchestrator.
#[macro_export]
macro_rules! root_span {
    ($subsystem:expr, $hash:expr) => {
        tracing::info_span!("root", subsystem = $subsystem, hash = %$hash)
    };
}

/// Increment a counter, optionally with label values.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
