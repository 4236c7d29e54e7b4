//! Insight and recommendation generation
//!
//! Both stages sit behind traits so the pipeline does not depend on how a
//! hypothesis or remediation is produced. The rule-based implementations in
//! [`rules`] are the defaults.

pub mod rules;

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::GuardResult;
use crate::model::{Anomaly, Insight, Recommendation};

pub use rules::{RuleBasedInsightProvider, RuleBasedRecommendationEngine, ServiceFamily};

/// Explains an anomaly
#[async_trait]
pub trait InsightProvider: Send + Sync + Debug {
    /// Produce a hypothesis for `anomaly`. The returned insight must carry the
    /// anomaly's dimension.
    async fn produce_insight(&self, anomaly: &Anomaly) -> GuardResult<Insight>;
}

/// Proposes a remediation for an anomaly
#[async_trait]
pub trait RecommendationEngine: Send + Sync + Debug {
    /// Produce exactly one recommendation with `target == anomaly.dimension`
    async fn produce_recommendation(
        &self,
        anomaly: &Anomaly,
        insight: &Insight,
    ) -> GuardResult<Recommendation>;
}
