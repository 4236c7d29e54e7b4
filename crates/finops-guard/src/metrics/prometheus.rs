//! Prometheus metrics for weekly pipeline runs
//!
//! Registered against a caller-owned [`Registry`], so an embedding program can
//! expose them next to its own metrics.

use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;
use std::sync::atomic::AtomicU64;

use crate::model::Severity;
use crate::notify::DeliveryStatus;

/// Label names
pub struct LabelNames;

impl LabelNames {
    pub const RESULT: &'static str = "result";
    pub const SEVERITY: &'static str = "severity";
    pub const STATUS: &'static str = "status";
}

/// Outcome of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunResult {
    Success,
    Error,
}

impl RunResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunResult::Success => "success",
            RunResult::Error => "error",
        }
    }
}

/// Metrics recorded by [`WeeklyPipeline`](crate::pipeline::WeeklyPipeline)
#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    /// Completed runs, labeled by result
    pub pipeline_runs_total: Family<Vec<(String, String)>, Counter<u64, AtomicU64>>,

    /// Cost rows received from the source
    pub rows_ingested_total: Counter<u64, AtomicU64>,

    /// Anomalies emitted, labeled by severity
    pub anomalies_detected_total: Family<Vec<(String, String)>, Counter<u64, AtomicU64>>,

    /// Notification attempts, labeled by delivery status
    pub notifications_total: Family<Vec<(String, String)>, Counter<u64, AtomicU64>>,

    /// Time spent in the detection stage
    pub detection_duration_seconds: Histogram,
}

impl PipelineMetrics {
    /// Create and register all metrics
    pub fn new(registry: &mut Registry) -> Self {
        let metrics = Self {
            pipeline_runs_total: Family::default(),
            rows_ingested_total: Counter::default(),
            anomalies_detected_total: Family::default(),
            notifications_total: Family::default(),
            detection_duration_seconds: Self::duration_histogram(),
        };

        registry.register(
            "finops_pipeline_runs",
            "Weekly cost review runs",
            metrics.pipeline_runs_total.clone(),
        );
        registry.register(
            "finops_rows_ingested",
            "Cost rows received from the cost source",
            metrics.rows_ingested_total.clone(),
        );
        registry.register(
            "finops_anomalies_detected",
            "Cost anomalies detected",
            metrics.anomalies_detected_total.clone(),
        );
        registry.register(
            "finops_notifications",
            "Report notifications by delivery status",
            metrics.notifications_total.clone(),
        );
        registry.register(
            "finops_detection_duration_seconds",
            "Duration of anomaly detection",
            metrics.detection_duration_seconds.clone(),
        );

        metrics
    }

    #[inline]
    pub fn record_run(&self, result: RunResult) {
        self.pipeline_runs_total
            .get_or_create(&vec![(LabelNames::RESULT.to_string(), result.as_str().to_string())])
            .inc();
    }

    #[inline]
    pub fn record_rows_ingested(&self, rows: usize) {
        self.rows_ingested_total.inc_by(rows as u64);
    }

    #[inline]
    pub fn record_anomaly(&self, severity: Severity) {
        self.anomalies_detected_total
            .get_or_create(&vec![(LabelNames::SEVERITY.to_string(), severity.to_string())])
            .inc();
    }

    #[inline]
    pub fn record_notification(&self, status: &DeliveryStatus) {
        self.notifications_total
            .get_or_create(&vec![(LabelNames::STATUS.to_string(), status.as_str().to_string())])
            .inc();
    }

    #[inline]
    pub fn record_detection_duration(&self, duration_secs: f64) {
        self.detection_duration_seconds.observe(duration_secs);
    }

    /// 0.5ms to ~16s
    fn duration_histogram() -> Histogram {
        Histogram::new(exponential_buckets(0.0005, 2.0, 16))
    }
}

/// Snapshot of counters for testing and debugging
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub runs_success: u64,
    pub runs_error: u64,
    pub rows_ingested: u64,
    pub anomalies_high: u64,
    pub anomalies_medium: u64,
    pub notifications_delivered: u64,
    pub notifications_failed: u64,
    pub notifications_not_configured: u64,
}

impl MetricsSnapshot {
    pub fn capture(metrics: &PipelineMetrics) -> Self {
        let runs = |result: RunResult| {
            metrics
                .pipeline_runs_total
                .get_or_create(&vec![(LabelNames::RESULT.to_string(), result.as_str().to_string())])
                .get()
        };
        let anomalies = |severity: Severity| {
            metrics
                .anomalies_detected_total
                .get_or_create(&vec![(LabelNames::SEVERITY.to_string(), severity.to_string())])
                .get()
        };
        let notifications = |status: &str| {
            metrics
                .notifications_total
                .get_or_create(&vec![(LabelNames::STATUS.to_string(), status.to_string())])
                .get()
        };

        Self {
            runs_success: runs(RunResult::Success),
            runs_error: runs(RunResult::Error),
            rows_ingested: metrics.rows_ingested_total.get(),
            anomalies_high: anomalies(Severity::High),
            anomalies_medium: anomalies(Severity::Medium),
            notifications_delivered: notifications("delivered"),
            notifications_failed: notifications("failed"),
            notifications_not_configured: notifications("not_configured"),
        }
    }
}
