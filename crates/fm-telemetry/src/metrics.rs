//! Prometheus metrics for the handshake and the peer set.
//!
//! All metrics follow the naming convention: `fm_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // HANDSHAKE METRICS
    // =========================================================================

    /// Handshakes by role and outcome
    pub static ref HANDSHAKES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("fm_handshake_total", "Identity handshakes by role and outcome"),
        &["role", "outcome"]  // role: initiator/responder, outcome: verified/sent/rejected/...
    ).expect("metric creation failed");

    /// Handshake duration histogram
    pub static ref HANDSHAKE_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "fm_handshake_duration_seconds",
            "Time from stream open/accept to close"
        ).buckets(exponential_buckets(0.0005, 2.0, 15).expect("valid buckets")),
        &["role"]
    ).expect("metric creation failed");

    // =========================================================================
    // PEER METRICS
    // =========================================================================

    /// Peers with a verified account address
    pub static ref REGISTERED_PEERS: Gauge = Gauge::new(
        "fm_peers_registered",
        "Number of peers bound to a verified account address"
    ).expect("metric creation failed");

    /// Connected peers
    pub static ref CONNECTED_PEERS: Gauge = Gauge::new(
        "fm_peers_connected",
        "Number of currently connected peers"
    ).expect("metric creation failed");
}

/// Handle to the metrics registry
#[derive(Clone)]
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
///
/// Registering twice fails with `MetricsInit`.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Handshake
        Box::new(HANDSHAKES_TOTAL.clone()),
        Box::new(HANDSHAKE_DURATION.clone()),
        // Peers
        Box::new(REGISTERED_PEERS.clone()),
        Box::new(CONNECTED_PEERS.clone()),
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

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: prometheus::Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for one labelled series of `histogram`.
    pub fn new(histogram: &HistogramVec, label: &str) -> Self {
        Self {
            histogram: histogram.with_label_values(&[label]),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing a labelled histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr, $label:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram, $label)
    };
}
