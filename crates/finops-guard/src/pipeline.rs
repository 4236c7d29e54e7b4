//! Weekly cost review pipeline
//!
//! One run executes the stages strictly in sequence, each consuming the full
//! output of the previous one:
//!
//! ```text
//! CostSource -> Normalizer -> AnomalyDetector -> InsightProvider
//!            -> RecommendationEngine -> ReportBuilder -> NotificationSink
//! ```
//!
//! Ingestion failures degrade to an empty dataset. Malformed rows and broken
//! insight contracts abort the run. Delivery failures never touch the
//! computed report; they are returned alongside it in [`WeeklyRun`].
//!
//! # Example
//!
//! ```rust,no_run
//! use finops_guard::{CostSeriesStore, GuardConfig, WeeklyPipeline};
//! use std::sync::Arc;
//!
//! # async fn run() -> finops_guard::GuardResult<()> {
//! let config = GuardConfig::from_file("finops.yaml")?;
//! let pipeline = WeeklyPipeline::builder(config)
//!     .source(Arc::new(CostSeriesStore::default()))
//!     .build()?;
//!
//! let run = pipeline.run_weekly().await?;
//! println!("{}", run.summary_json());
//! # Ok(())
//! # }
//! ```

use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::analyzer::AnomalyDetector;
use crate::config::GuardConfig;
use crate::error::{GuardError, GuardResult};
use crate::ingestion::{CostSeriesStore, CostSource};
use crate::insight::{
    InsightProvider, RecommendationEngine, RuleBasedInsightProvider, RuleBasedRecommendationEngine,
};
use crate::metrics::{PipelineMetrics, RunResult};
use crate::model::{Anomaly, Insight, RawCostRow, Recommendation, ReportPayload};
use crate::normalization::{NormalizationStats, Normalizer};
use crate::notify::{DeliveryStatus, NotificationSink, TeamsNotifier};
use crate::report::ReportBuilder;

/// Result of one weekly run
#[derive(Debug)]
pub struct WeeklyRun {
    pub report: ReportPayload,
    pub delivery: DeliveryStatus,
}

impl WeeklyRun {
    /// `Err` if the report was computed but could not be delivered
    pub fn delivery_result(&self) -> Result<(), &GuardError> {
        match &self.delivery {
            DeliveryStatus::Failed(err) => Err(err),
            _ => Ok(()),
        }
    }

    pub fn into_report(self) -> ReportPayload {
        self.report
    }

    /// Compact run summary for schedulers and logs
    pub fn summary_json(&self) -> Value {
        json!({
            "anomaly_count": self.report.anomalies.len(),
            "estimated_monthly_savings_usd": self.report.estimated_monthly_savings_usd(),
            "anomalies": self.report.anomalies,
        })
    }
}

/// Notifier selection made on the builder
#[derive(Debug)]
enum NotifierChoice {
    /// Build from `notification` config; disabled without a webhook
    FromConfig,
    Explicit(Arc<dyn NotificationSink>),
    Disabled,
}

/// Builder for [`WeeklyPipeline`]
#[derive(Debug)]
pub struct WeeklyPipelineBuilder {
    config: GuardConfig,
    source: Option<Arc<dyn CostSource>>,
    insight_provider: Option<Arc<dyn InsightProvider>>,
    recommendation_engine: Option<Arc<dyn RecommendationEngine>>,
    notifier: NotifierChoice,
    today: Option<NaiveDate>,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl WeeklyPipelineBuilder {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            config,
            source: None,
            insight_provider: None,
            recommendation_engine: None,
            notifier: NotifierChoice::FromConfig,
            today: None,
            metrics: None,
        }
    }

    pub fn source(mut self, source: Arc<dyn CostSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn insight_provider(mut self, provider: Arc<dyn InsightProvider>) -> Self {
        self.insight_provider = Some(provider);
        self
    }

    pub fn recommendation_engine(mut self, engine: Arc<dyn RecommendationEngine>) -> Self {
        self.recommendation_engine = Some(engine);
        self
    }

    /// Use `sink` instead of the configured webhook
    pub fn notifier(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notifier = NotifierChoice::Explicit(sink);
        self
    }

    /// Skip notification even if a webhook is configured
    pub fn without_notifier(mut self) -> Self {
        self.notifier = NotifierChoice::Disabled;
        self
    }

    /// Run date used for undated rows and the default source window
    pub fn today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Validate configuration and assemble the pipeline.
    ///
    /// # Errors
    ///
    /// Returns `GuardError::Configuration` for invalid thresholds or
    /// notification settings.
    pub fn build(self) -> GuardResult<WeeklyPipeline> {
        self.config.validate()?;

        let today = self.today.unwrap_or_else(|| Utc::now().date_naive());
        let detector = AnomalyDetector::new(self.config.thresholds.clone())?;

        let notifier: Option<Arc<dyn NotificationSink>> = match self.notifier {
            NotifierChoice::Explicit(sink) => Some(sink),
            NotifierChoice::Disabled => None,
            NotifierChoice::FromConfig => TeamsNotifier::from_config(&self.config.notification)?
                .map(|n| Arc::new(n) as Arc<dyn NotificationSink>),
        };

        Ok(WeeklyPipeline {
            source: self
                .source
                .unwrap_or_else(|| Arc::new(CostSeriesStore::new(today))),
            normalizer: Normalizer::new(today),
            detector,
            insight_provider: self
                .insight_provider
                .unwrap_or_else(|| Arc::new(RuleBasedInsightProvider::new())),
            recommendation_engine: self
                .recommendation_engine
                .unwrap_or_else(|| Arc::new(RuleBasedRecommendationEngine::new())),
            report_builder: ReportBuilder::new(),
            notifier,
            metrics: self.metrics,
            config: self.config,
        })
    }
}

/// Weekly cost review pipeline
#[derive(Debug)]
pub struct WeeklyPipeline {
    config: GuardConfig,
    source: Arc<dyn CostSource>,
    normalizer: Normalizer,
    detector: AnomalyDetector,
    insight_provider: Arc<dyn InsightProvider>,
    recommendation_engine: Arc<dyn RecommendationEngine>,
    report_builder: ReportBuilder,
    notifier: Option<Arc<dyn NotificationSink>>,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl WeeklyPipeline {
    pub fn builder(config: GuardConfig) -> WeeklyPipelineBuilder {
        WeeklyPipelineBuilder::new(config)
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn has_notifier(&self) -> bool {
        self.notifier.is_some()
    }

    /// Execute every stage once.
    ///
    /// # Errors
    ///
    /// Fails on malformed cost rows or a broken insight/recommendation
    /// contract. Delivery failures are reported in [`WeeklyRun::delivery`].
    pub async fn run_weekly(&self) -> GuardResult<WeeklyRun> {
        let started = Instant::now();
        info!(source = self.source.name(), "Starting weekly cost review");

        let result = self.execute().await;

        if let Some(metrics) = &self.metrics {
            metrics.record_run(if result.is_ok() {
                RunResult::Success
            } else {
                RunResult::Error
            });
        }

        match &result {
            Ok(run) => info!(
                anomalies = run.report.anomalies.len(),
                estimated_monthly_savings_usd = run.report.estimated_monthly_savings_usd(),
                delivery = run.delivery.as_str(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Weekly cost review complete"
            ),
            Err(e) => warn!(error = %e, "Weekly cost review failed"),
        }

        result
    }

    async fn execute(&self) -> GuardResult<WeeklyRun> {
        let mut rows = self.ingest().await;
        self.normalize(&mut rows);

        let anomalies = self.detect(&rows)?;
        let insights = self.generate_insights(&anomalies).await?;
        let recommendations = self.recommend(&anomalies, &insights).await?;

        let report = self.build_report(anomalies, recommendations);
        let delivery = self.notify(&report).await;

        Ok(WeeklyRun { report, delivery })
    }

    /// Fetch rows for the configured lookback. A source error yields no rows.
    pub async fn ingest(&self) -> Vec<RawCostRow> {
        let lookback_days = self.config.aws.lookback_days;

        let rows = match self.source.fetch_costs(lookback_days).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    source = self.source.name(),
                    error = %e,
                    "Cost source unavailable, continuing with an empty dataset"
                );
                Vec::new()
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_rows_ingested(rows.len());
        }
        info!(rows = rows.len(), lookback_days, "Ingested cost rows");

        rows
    }

    pub fn normalize(&self, rows: &mut [RawCostRow]) -> NormalizationStats {
        self.normalizer.normalize(rows)
    }

    pub fn detect(&self, rows: &[RawCostRow]) -> GuardResult<Vec<Anomaly>> {
        let started = Instant::now();
        let detection = self.detector.analyze(rows)?;

        debug!(stats = ?detection.stats, "Detection statistics");

        if let Some(metrics) = &self.metrics {
            metrics.record_detection_duration(started.elapsed().as_secs_f64());
            for anomaly in &detection.anomalies {
                metrics.record_anomaly(anomaly.severity);
            }
        }

        Ok(detection.anomalies)
    }

    /// One insight per anomaly, in order
    pub async fn generate_insights(&self, anomalies: &[Anomaly]) -> GuardResult<Vec<Insight>> {
        let mut insights = Vec::with_capacity(anomalies.len());

        for anomaly in anomalies {
            let insight = self.insight_provider.produce_insight(anomaly).await?;
            if insight.dimension != anomaly.dimension {
                return Err(GuardError::Insight {
                    reason: format!(
                        "insight for {} returned for anomaly on {}",
                        insight.dimension, anomaly.dimension
                    ),
                });
            }
            insights.push(insight);
        }

        Ok(insights)
    }

    /// One recommendation per anomaly, targeting its dimension
    pub async fn recommend(
        &self,
        anomalies: &[Anomaly],
        insights: &[Insight],
    ) -> GuardResult<Vec<Recommendation>> {
        if anomalies.len() != insights.len() {
            return Err(GuardError::Insight {
                reason: format!(
                    "{} insights for {} anomalies",
                    insights.len(),
                    anomalies.len()
                ),
            });
        }

        let mut recommendations = Vec::with_capacity(anomalies.len());
        for (anomaly, insight) in anomalies.iter().zip(insights) {
            let recommendation = self
                .recommendation_engine
                .produce_recommendation(anomaly, insight)
                .await?;

            if recommendation.target != anomaly.dimension {
                return Err(GuardError::Insight {
                    reason: format!(
                        "recommendation targets {} but anomaly is on {}",
                        recommendation.target, anomaly.dimension
                    ),
                });
            }
            recommendations.push(recommendation);
        }

        Ok(recommendations)
    }

    pub fn build_report(
        &self,
        anomalies: Vec<Anomaly>,
        recommendations: Vec<Recommendation>,
    ) -> ReportPayload {
        self.report_builder.build(anomalies, recommendations)
    }

    /// Deliver once. Never fails the run.
    pub async fn notify(&self, report: &ReportPayload) -> DeliveryStatus {
        let status = match &self.notifier {
            None => {
                info!("Notifier not configured, skipping delivery");
                DeliveryStatus::NotConfigured
            }
            Some(sink) => match sink.deliver(report).await {
                Ok(()) => DeliveryStatus::Delivered,
                Err(e) => {
                    warn!(sink = sink.name(), error = %e, "Report delivery failed");
                    DeliveryStatus::Failed(e)
                }
            },
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_notification(&status);
        }

        status
    }
}
