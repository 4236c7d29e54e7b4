//! Pipeline metrics

pub mod prometheus;

pub use prometheus::{LabelNames, MetricsSnapshot, PipelineMetrics, RunResult};
