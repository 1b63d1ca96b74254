//! Observability infrastructure for the exporter
//!
//! Provides:
//! - Prometheus self-metrics (scrape latency, scrape/watch errors, snapshot size, build info)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_gauge, GaugeVec,
    Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for scrape latency (in seconds)
const SCRAPE_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ExporterMetricsInner> = OnceLock::new();

struct ExporterMetricsInner {
    scrape_duration_seconds: Histogram,
    scrapes_total: IntCounter,
    scrape_errors_total: IntCounter,
    watch_errors_total: IntCounter,
    objects_listed: IntGauge,
    samples_emitted: IntGauge,
    build_info: GaugeVec,
}

impl ExporterMetricsInner {
    fn new() -> Self {
        Self {
            scrape_duration_seconds: register_histogram!(
                "kube_state_exporter_scrape_duration_seconds",
                "Time spent generating and rendering metric families for one scrape",
                SCRAPE_BUCKETS.to_vec()
            )
            .expect("Failed to register scrape_duration_seconds"),

            scrapes_total: register_int_counter!(
                "kube_state_exporter_scrapes_total",
                "Total number of successful scrapes"
            )
            .expect("Failed to register scrapes_total"),

            scrape_errors_total: register_int_counter!(
                "kube_state_exporter_scrape_errors_total",
                "Total number of scrapes that failed to list or render"
            )
            .expect("Failed to register scrape_errors_total"),

            watch_errors_total: register_int_counter!(
                "kube_state_exporter_watch_errors_total",
                "Total number of errors from the pod watch stream"
            )
            .expect("Failed to register watch_errors_total"),

            objects_listed: register_int_gauge!(
                "kube_state_exporter_objects_listed",
                "Number of objects in the snapshot of the last scrape"
            )
            .expect("Failed to register objects_listed"),

            samples_emitted: register_int_gauge!(
                "kube_state_exporter_samples_emitted",
                "Number of samples emitted by the last scrape"
            )
            .expect("Failed to register samples_emitted"),

            build_info: register_gauge_vec!(
                "kube_state_exporter_build_info",
                "Build information of the running exporter",
                &["version"]
            )
            .expect("Failed to register build_info"),
        }
    }
}

/// Exporter self-metrics
///
/// This is a lightweight handle to the global metrics instance, which lives
/// in the default `prometheus` registry. Clones share the same metrics.
#[derive(Clone)]
pub struct ExporterMetrics {
    _private: (),
}

impl Default for ExporterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ExporterMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ExporterMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ExporterMetricsInner {
        GLOBAL_METRICS.get_or_init(ExporterMetricsInner::new)
    }

    /// Record a successful scrape
    pub fn observe_scrape(&self, duration_secs: f64, objects: usize, samples: usize) {
        let inner = self.inner();
        inner.scrape_duration_seconds.observe(duration_secs);
        inner.scrapes_total.inc();
        inner.objects_listed.set(objects as i64);
        inner.samples_emitted.set(samples as i64);
    }

    pub fn inc_scrape_errors(&self) {
        self.inner().scrape_errors_total.inc();
    }

    pub fn inc_watch_errors(&self) {
        self.inner().watch_errors_total.inc();
    }

    pub fn set_build_info(&self, version: &str) {
        self.inner().build_info.reset();
        self.inner().build_info.with_label_values(&[version]).set(1.0);
    }

    pub fn scrapes(&self) -> u64 {
        self.inner().scrapes_total.get()
    }

    pub fn scrape_errors(&self) -> u64 {
        self.inner().scrape_errors_total.get()
    }

    pub fn watch_errors(&self) -> u64 {
        self.inner().watch_errors_total.get()
    }
}

/// Structured logger for exporter events
///
/// Every event carries an `event` field and the node the exporter runs on,
/// so JSON log pipelines can filter on them.
#[derive(Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    pub fn log_startup(&self, version: &str, port: u16, namespace: Option<&str>) {
        info!(
            event = "exporter_started",
            node = %self.node_name,
            version = %version,
            port = port,
            namespace = %namespace.unwrap_or("<all>"),
            "Kube state exporter started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "exporter_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Kube state exporter shutting down"
        );
    }

    pub fn log_scrape(&self, objects: usize, families: usize, samples: usize, duration_ms: u64) {
        info!(
            event = "scrape_completed",
            node = %self.node_name,
            objects = objects,
            families = families,
            samples = samples,
            duration_ms = duration_ms,
            "Served metrics scrape"
        );
    }

    pub fn log_scrape_failure(&self, error: &str) {
        warn!(
            event = "scrape_failed",
            node = %self.node_name,
            error = %error,
            "Metrics scrape failed"
        );
    }

    /// Log completion of the initial pod list
    pub fn log_store_synced(&self, objects: usize) {
        info!(
            event = "store_synced",
            node = %self.node_name,
            objects = objects,
            "Pod store synced"
        );
    }

    pub fn log_watch_error(&self, error: &str) {
        warn!(
            event = "watch_error",
            node = %self.node_name,
            error = %error,
            "Pod watch error, retrying with backoff"
        );
    }
}
