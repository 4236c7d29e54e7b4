//! Weekly cloud cost review for FinOps teams
//!
//! This crate pulls daily cost-by-account-by-service rows, flags statistically
//! anomalous spikes against a rolling baseline, attaches a hypothesis and a
//! remediation to each anomaly, and delivers a summarized report to a chat
//! webhook.
//!
//! The entry point is [`WeeklyPipeline::run_weekly`].

pub mod analyzer;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod insight;
pub mod metrics;
pub mod model;
pub mod normalization;
pub mod notify;
pub mod pipeline;
pub mod report;
pub mod telemetry;

// Re-export commonly used types
pub use analyzer::{AnomalyDetector, Detection, DetectionStats};

pub use config::{AwsConfig, GuardConfig, NotificationConfig, ThresholdConfig};

pub use error::{GuardError, GuardResult};

pub use ingestion::{CostSeriesStore, CostSource};

pub use insight::{
    InsightProvider, RecommendationEngine, RuleBasedInsightProvider,
    RuleBasedRecommendationEngine, ServiceFamily,
};

pub use metrics::{MetricsSnapshot, PipelineMetrics};

pub use model::{
    Anomaly, Confidence, CostPoint, Dimension, Effort, Insight, RawCostRow, Recommendation,
    ReportPayload, RiskLevel, Severity, TimeSeries,
};

pub use normalization::{NormalizationStats, Normalizer};

pub use notify::{DeliveryStatus, NotificationSink, TeamsNotifier};

pub use pipeline::{WeeklyPipeline, WeeklyPipelineBuilder, WeeklyRun};

pub use report::ReportBuilder;
