// Prometheus metrics definitions for the rotation backend.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Gauges ───────────────────────────────────────────────────────

    /// Rotation index live at the most recent request.
    pub static ref CURRENT_ROTATION: IntGauge =
        IntGauge::new("rotation_current_index", "Rotation index live at the last request").unwrap();

    /// Reward rows loaded, by locale.
    pub static ref REWARD_ENTRIES_LOADED: IntGaugeVec = IntGaugeVec::new(
        Opts::new("rotation_reward_entries_loaded", "Reward rows loaded from the dataset"),
        &["locale"],
    )
    .unwrap();

    // ── Counters ─────────────────────────────────────────────────────

    /// Total API requests, by method/endpoint/status.
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("rotation_api_requests_total", "Total API requests"),
        &["method", "endpoint", "status"],
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// API request duration in seconds, by endpoint.
    pub static ref API_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "rotation_api_request_duration_seconds",
            "API request duration in seconds",
        )
        .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["endpoint"],
    )
    .unwrap();
}

/// Register all metrics with the custom registry. Safe to call more than once.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(CURRENT_ROTATION.clone()),
        Box::new(REWARD_ENTRIES_LOADED.clone()),
        Box::new(API_REQUESTS_TOTAL.clone()),
        Box::new(API_REQUEST_DURATION_SECONDS.clone()),
    ];

    for c in collectors {
        match REGISTRY.register(c) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => tracing::error!("Failed to register metric: {e}"),
        }
    }
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {e}");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Normalize a URL path for metric labels: replace numeric path segments with `:id`.
///
/// Every route is static, so this only touches paths that fell through to the
/// 404 fallback. Arbitrary client paths would otherwise each mint a label set.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.parse::<i64>().is_ok() {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
