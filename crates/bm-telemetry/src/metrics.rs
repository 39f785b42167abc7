//! Prometheus metrics for Blockmania subsystems.
//!
//! All metrics follow the naming convention: `bm_<subsystem>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // STORAGE (bm-01)
    // =========================================================================

    /// Block-graph records written
    pub static ref GRAPHS_STORED: Counter = Counter::new(
        "bm_storage_graphs_stored_total",
        "Total block-graph records written"
    ).expect("metric creation failed");

    // =========================================================================
    // QUORUM (bm-02)
    // =========================================================================

    /// Job transitions by target state
    pub static ref JOB_TRANSITIONS: CounterVec = CounterVec::new(
        Opts::new("bm_quorum_job_transitions_total", "Job state transitions"),
        &["state"]
    ).expect("metric creation failed");

    /// Roots that reached quorum
    pub static ref QUORUM_REACHED: Counter = Counter::new(
        "bm_quorum_reached_total",
        "Total roots that reached quorum"
    ).expect("metric creation failed");

    // =========================================================================
    // ORCHESTRATOR (bm-03)
    // =========================================================================

    /// Fragments rejected, by reason
    pub static ref FRAGMENTS_REJECTED: CounterVec = CounterVec::new(
        Opts::new("bm_orchestrator_fragments_rejected_total", "Fragments rejected"),
        &["reason"]
    ).expect("metric creation failed");

    /// Blocks appended to ordering engines
    pub static ref ENGINE_APPENDS: Counter = Counter::new(
        "bm_orchestrator_engine_appends_total",
        "Blocks appended to ordering engines"
    ).expect("metric creation failed");

    /// Interpreted batches, by outcome (polished/rejected/failed)
    pub static ref INTERPRETED_BATCHES: CounterVec = CounterVec::new(
        Opts::new("bm_orchestrator_interpreted_batches_total", "Interpreted batches handled"),
        &["outcome"]
    ).expect("metric creation failed");

    /// Live per-root orchestrators
    pub static ref LIVE_ORCHESTRATORS: Gauge = Gauge::new(
        "bm_orchestrator_live",
        "Number of live per-root orchestrators"
    ).expect("metric creation failed");

    // =========================================================================
    // RELIABLE DELIVERY (bm-04)
    // =========================================================================

    /// Deliveries re-sent after the redelivery interval
    pub static ref REDELIVERIES: Counter = Counter::new(
        "bm_delivery_redeliveries_total",
        "Deliveries re-sent because no acknowledgement arrived"
    ).expect("metric creation failed");

    /// Replayed deliveries dropped by receivers
    pub static ref DUPLICATE_DELIVERIES: Counter = Counter::new(
        "bm_delivery_duplicates_total",
        "Replayed deliveries acknowledged and dropped"
    ).expect("metric creation failed");

    /// Deliveries awaiting acknowledgement
    pub static ref PENDING_DELIVERIES: Gauge = Gauge::new(
        "bm_delivery_pending",
        "Deliveries awaiting acknowledgement"
    ).expect("metric creation failed");

    // =========================================================================
    // GOSSIP (bm-05)
    // =========================================================================

    /// Batch pushes by outcome (ok/failed)
    pub static ref GOSSIP_PUSHES: CounterVec = CounterVec::new(
        Opts::new("bm_gossip_pushes_total", "Batch pushes to peers"),
        &["outcome"]
    ).expect("metric creation failed");

    /// Round-trip time of batch pushes
    pub static ref GOSSIP_PUSH_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "bm_gossip_push_duration_seconds",
            "Time spent pushing one batch to one peer"
        ).buckets(exponential_buckets(0.001, 2.0, 14).expect("bucket layout"))
    ).expect("metric creation failed");
}

/// Handle keeping the registry alive.
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(GRAPHS_STORED.clone()),
        Box::new(JOB_TRANSITIONS.clone()),
        Box::new(QUORUM_REACHED.clone()),
        Box::new(FRAGMENTS_REJECTED.clone()),
        Box::new(ENGINE_APPENDS.clone()),
        Box::new(INTERPRETED_BATCHES.clone()),
        Box::new(LIVE_ORCHESTRATORS.clone()),
        Box::new(REDELIVERIES.clone()),
        Box::new(DUPLICATE_DELIVERIES.clone()),
        Box::new(PENDING_DELIVERIES.clone()),
        Box::new(GOSSIP_PUSHES.clone()),
        Box::new(GOSSIP_PUSH_DURATION.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Observes the elapsed time into a histogram when dropped.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
