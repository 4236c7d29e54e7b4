//! Rule-based insight and recommendation generation
//!
//! Anomalies are classified by the service half of their dimension into a
//! [`ServiceFamily`]. Each family has a canned hypothesis, a remediation and
//! the share of the daily overspend that remediation typically recovers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;
use uuid::Uuid;

use super::{InsightProvider, RecommendationEngine};
use crate::analyzer::stats::round2;
use crate::analyzer::ZERO_VARIANCE_SCORE;
use crate::error::{GuardError, GuardResult};
use crate::model::{
    Anomaly, Confidence, Effort, Insight, Recommendation, RiskLevel, DIMENSION_SEPARATOR,
};

/// Days used to project a daily overspend to a month
pub const DAYS_PER_MONTH: f64 = 30.0;

/// Lowest confidence assigned to a rule-based insight
pub const MIN_RULE_CONFIDENCE: f64 = 0.5;

/// Highest confidence assigned to a rule-based insight
pub const MAX_RULE_CONFIDENCE: f64 = 0.95;

/// Coarse grouping of cloud services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceFamily {
    Compute,
    Storage,
    Database,
    DataTransfer,
    Other,
}

impl ServiceFamily {
    /// Classify a service name such as `AmazonEC2` or `AWSDataTransfer`
    pub fn classify(service: &str) -> Self {
        let name = service.to_ascii_lowercase();
        let matches = |needles: &[&str]| needles.iter().any(|n| name.contains(n));

        // Transfer first: "EC2 - Data Transfer" style names belong here
        if matches(&["transfer", "cloudfront", "nat gateway", "natgateway"]) {
            ServiceFamily::DataTransfer
        } else if matches(&["rds", "dynamodb", "aurora", "redshift", "database", "elasticache"]) {
            ServiceFamily::Database
        } else if matches(&["s3", "storage", "ebs", "glacier", "efs", "backup"]) {
            ServiceFamily::Storage
        } else if matches(&["ec2", "compute", "lambda", "ecs", "eks", "fargate", "lightsail"]) {
            ServiceFamily::Compute
        } else {
            ServiceFamily::Other
        }
    }

    /// Classify the service half of an `account:service` key
    pub fn of_dimension(dimension: &str) -> Self {
        let service = dimension
            .split_once(DIMENSION_SEPARATOR)
            .map(|(_, service)| service)
            .unwrap_or(dimension);
        Self::classify(service)
    }

    /// Share of the daily overspend the family's remediation usually recovers
    pub fn recoverable_fraction(&self) -> f64 {
        match self {
            ServiceFamily::Compute => 0.5,
            ServiceFamily::Storage => 0.4,
            ServiceFamily::Database => 0.3,
            ServiceFamily::DataTransfer => 0.35,
            ServiceFamily::Other => 0.25,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceFamily::Compute => "compute",
            ServiceFamily::Storage => "storage",
            ServiceFamily::Database => "database",
            ServiceFamily::DataTransfer => "data transfer",
            ServiceFamily::Other => "other",
        }
    }
}

impl fmt::Display for ServiceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Insights
// ============================================================================

/// Hypotheses keyed on service family, confidence keyed on score
#[derive(Debug, Clone, Default)]
pub struct RuleBasedInsightProvider;

impl RuleBasedInsightProvider {
    pub fn new() -> Self {
        Self
    }

    /// Confidence grows with the score and saturates at the sentinel score
    pub fn confidence_for(score: f64) -> Confidence {
        Confidence::new((score / ZERO_VARIANCE_SCORE).clamp(MIN_RULE_CONFIDENCE, MAX_RULE_CONFIDENCE))
    }

    fn hypothesis(family: ServiceFamily, anomaly: &Anomaly) -> String {
        let cause = match family {
            ServiceFamily::Compute => {
                "new, resized or idle instances left running, or an autoscaling group that did not scale back in"
            }
            ServiceFamily::Storage => {
                "rapid data growth, missing lifecycle rules, or unattached volumes and stale snapshots"
            }
            ServiceFamily::Database => {
                "a larger instance class, increased provisioned capacity, or a burst of read/write traffic"
            }
            ServiceFamily::DataTransfer => {
                "new cross-region or internet egress, or traffic routed through NAT gateways"
            }
            ServiceFamily::Other => "a change in usage that needs review by the owning team",
        };

        format!(
            "Spend for {} rose ${:.2} ({:.1}%) above its baseline on {} (z={:.2}). Likely cause: {}.",
            anomaly.dimension, anomaly.delta_abs, anomaly.delta_pct, anomaly.day, anomaly.score, cause
        )
    }
}

#[async_trait]
impl InsightProvider for RuleBasedInsightProvider {
    async fn produce_insight(&self, anomaly: &Anomaly) -> GuardResult<Insight> {
        let family = ServiceFamily::of_dimension(&anomaly.dimension);
        trace!(dimension = %anomaly.dimension, %family, "Producing rule-based insight");

        Ok(Insight {
            id: Uuid::new_v4().to_string(),
            dimension: anomaly.dimension.clone(),
            hypothesis: Self::hypothesis(family, anomaly),
            confidence: Self::confidence_for(anomaly.score),
        })
    }
}

// ============================================================================
// Recommendations
// ============================================================================

/// Remediations keyed on service family, savings scaled by insight confidence
#[derive(Debug, Clone, Default)]
pub struct RuleBasedRecommendationEngine;

impl RuleBasedRecommendationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Monthly savings if the overspend is remediated
    pub fn estimate_monthly_savings(
        family: ServiceFamily,
        delta_abs: f64,
        confidence: Confidence,
    ) -> f64 {
        let projected = delta_abs.max(0.0) * DAYS_PER_MONTH * family.recoverable_fraction();
        round2(projected * confidence.value())
    }

    fn remediation(family: ServiceFamily, target: &str) -> (String, Effort, RiskLevel) {
        match family {
            ServiceFamily::Compute => (
                format!("Rightsize or schedule idle compute in {target}"),
                Effort::Medium,
                RiskLevel::Low,
            ),
            ServiceFamily::Storage => (
                format!("Apply lifecycle policies and delete unattached volumes in {target}"),
                Effort::Low,
                RiskLevel::Low,
            ),
            ServiceFamily::Database => (
                format!("Review instance class and provisioned capacity of {target}"),
                Effort::Medium,
                RiskLevel::Medium,
            ),
            ServiceFamily::DataTransfer => (
                format!("Audit cross-region and NAT traffic for {target}"),
                Effort::High,
                RiskLevel::Medium,
            ),
            ServiceFamily::Other => (
                format!("Investigate the cost increase in {target} with its owners"),
                Effort::Low,
                RiskLevel::Low,
            ),
        }
    }
}

#[async_trait]
impl RecommendationEngine for RuleBasedRecommendationEngine {
    async fn produce_recommendation(
        &self,
        anomaly: &Anomaly,
        insight: &Insight,
    ) -> GuardResult<Recommendation> {
        if insight.dimension != anomaly.dimension {
            return Err(GuardError::Insight {
                reason: format!(
                    "insight {} is for {}, not {}",
                    insight.id, insight.dimension, anomaly.dimension
                ),
            });
        }

        let family = ServiceFamily::of_dimension(&anomaly.dimension);
        let (action, effort, risk) = Self::remediation(family, &anomaly.dimension);

        Ok(Recommendation {
            action,
            target: anomaly.dimension.clone(),
            estimated_monthly_savings_usd: Self::estimate_monthly_savings(
                family,
                anomaly.delta_abs,
                insight.confidence,
            ),
            effort,
            risk,
        })
    }
}
