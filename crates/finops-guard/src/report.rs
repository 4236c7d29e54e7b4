//! Weekly report assembly

use std::collections::HashMap;
use tracing::debug;

use crate::model::{
    Anomaly, Recommendation, ReportPayload, METRIC_ANOMALY_COUNT, METRIC_ESTIMATED_SAVINGS,
};

pub const REPORT_TITLE: &str = "FinOps Guard Weekly Report";

pub const REPORT_SUMMARY: &str =
    "Weekly cloud cost review with anomalies and prioritized recommendations.";

/// Aggregates anomalies and recommendations into a [`ReportPayload`]
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder;

impl ReportBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the payload. Inputs are index-aligned and kept in order.
    ///
    /// Savings are the plain sum of the recommendations' estimates; each
    /// estimate is already rounded to cents.
    pub fn build(
        &self,
        anomalies: Vec<Anomaly>,
        recommendations: Vec<Recommendation>,
    ) -> ReportPayload {
        let savings: f64 = recommendations
            .iter()
            .fold(0.0, |total, r| total + r.estimated_monthly_savings_usd);

        let mut metrics = HashMap::with_capacity(2);
        metrics.insert(METRIC_ANOMALY_COUNT.to_string(), anomalies.len() as f64);
        metrics.insert(METRIC_ESTIMATED_SAVINGS.to_string(), savings);

        debug!(
            anomalies = anomalies.len(),
            recommendations = recommendations.len(),
            estimated_monthly_savings_usd = savings,
            "Built weekly report"
        );

        ReportPayload {
            title: REPORT_TITLE.to_string(),
            summary: REPORT_SUMMARY.to_string(),
            metrics,
            anomalies,
            recommendations,
        }
    }
}
