//! Domain types shared by every pipeline stage
//!
//! Rows enter as [`RawCostRow`] (fields optional, as delivered by ingestion),
//! become [`CostPoint`]s once their day is parsed, and are grouped per
//! [`Dimension`] into [`TimeSeries`]. Detection emits [`Anomaly`] records which
//! flow into [`Insight`]s, [`Recommendation`]s and finally a [`ReportPayload`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{GuardError, GuardResult};

/// Date format of the `day` field
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Separator between account and service in a dimension key
pub const DIMENSION_SEPARATOR: char = ':';

/// Default account/service for rows that carry none
pub const UNKNOWN: &str = "unknown";

/// Default cost allocation tag
pub const UNALLOCATED: &str = "unallocated";

/// A cost row as delivered by the ingestion boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCostRow {
    #[serde(default)]
    pub day: Option<String>,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    pub cost_usd: f64,
}

impl RawCostRow {
    /// Create a fully populated row
    pub fn new(
        day: impl Into<String>,
        account: impl Into<String>,
        service: impl Into<String>,
        tag: impl Into<String>,
        cost_usd: f64,
    ) -> Self {
        Self {
            day: Some(day.into()),
            account: Some(account.into()),
            service: Some(service.into()),
            tag: Some(tag.into()),
            cost_usd,
        }
    }

    /// Create a row with only a cost; everything else is left for the normalizer
    pub fn cost_only(cost_usd: f64) -> Self {
        Self {
            day: None,
            account: None,
            service: None,
            tag: None,
            cost_usd,
        }
    }

    /// Dimension this row belongs to
    pub fn dimension(&self) -> Dimension {
        Dimension::new(
            self.account.as_deref().unwrap_or(UNKNOWN),
            self.service.as_deref().unwrap_or(UNKNOWN),
        )
    }
}

/// A single daily cost observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostPoint {
    pub day: NaiveDate,
    pub account: String,
    pub service: String,
    pub tag: String,
    pub cost_usd: f64,
}

impl CostPoint {
    /// Convert a normalized row, reporting `index` in any error
    pub fn from_row(index: usize, row: &RawCostRow) -> GuardResult<Self> {
        let dimension = row.dimension();

        let raw_day = row.day.as_deref().ok_or_else(|| GuardError::DataParse {
            row: index,
            dimension: dimension.to_string(),
            value: String::new(),
            reason: "day is missing".to_string(),
        })?;

        let day = NaiveDate::parse_from_str(raw_day.trim(), DAY_FORMAT).map_err(|e| {
            GuardError::DataParse {
                row: index,
                dimension: dimension.to_string(),
                value: raw_day.to_string(),
                reason: e.to_string(),
            }
        })?;

        if !row.cost_usd.is_finite() || row.cost_usd < 0.0 {
            return Err(GuardError::InvalidCost {
                row: index,
                dimension: dimension.to_string(),
                cost: row.cost_usd,
            });
        }

        Ok(Self {
            day,
            account: row.account.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            service: row.service.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            tag: row.tag.clone().unwrap_or_else(|| UNALLOCATED.to_string()),
            cost_usd: row.cost_usd,
        })
    }

    pub fn dimension(&self) -> Dimension {
        Dimension::new(&self.account, &self.service)
    }
}

/// Grouping key `account:service`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dimension(String);

impl Dimension {
    pub fn new(account: &str, service: &str) -> Self {
        Self(format!("{account}{DIMENSION_SEPARATOR}{service}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Service half of the key
    pub fn service(&self) -> &str {
        self.0
            .split_once(DIMENSION_SEPARATOR)
            .map(|(_, service)| service)
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Day-ordered costs of one dimension
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub dimension: Dimension,
    pub points: Vec<(NaiveDate, f64)>,
}

impl TimeSeries {
    pub fn new(dimension: Dimension) -> Self {
        Self {
            dimension,
            points: Vec::new(),
        }
    }

    pub fn push(&mut self, day: NaiveDate, cost_usd: f64) {
        self.points.push((day, cost_usd));
    }

    /// Sort ascending by day. Stable: same-day points keep input order.
    pub fn sort_by_day(&mut self) {
        self.points.sort_by_key(|(day, _)| *day);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Split the trailing `baseline_days + 1` points into the baseline and the
    /// evaluated (last) point. Returns `None` for an empty series.
    pub fn evaluation_window(&self, baseline_days: usize) -> Option<(&[(NaiveDate, f64)], (NaiveDate, f64))> {
        let window_len = baseline_days.saturating_add(1).min(self.points.len());
        let window = &self.points[self.points.len() - window_len..];
        let (evaluated, baseline) = window.split_last()?;
        Some((baseline, *evaluated))
    }
}

/// Anomaly severity. There is no lower level: anything below the z-score
/// threshold is not an anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A statistically significant upward cost spike
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    /// Evaluated day
    pub day: NaiveDate,
    /// `account:service` key
    pub dimension: String,
    /// Evaluated cost minus baseline mean (USD, 2 decimals)
    pub delta_abs: f64,
    /// Increase relative to baseline mean (percent, 2 decimals)
    pub delta_pct: f64,
    /// Z-score against the baseline (2 decimals)
    pub score: f64,
    pub severity: Severity,
}

/// Confidence level (0.0-1.0)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Confidence(f64);

impl Confidence {
    /// Create a new confidence value, clamped to 0.0-1.0
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Check if confidence is high (>= 0.8)
    pub fn is_high(&self) -> bool {
        self.0 >= 0.8
    }
}

/// Natural-language explanation of an anomaly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub id: String,
    pub dimension: String,
    pub hypothesis: String,
    pub confidence: Confidence,
}

/// Effort needed to carry out a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    Low,
    Medium,
    High,
}

/// Risk of carrying out a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Remediation proposed for one anomaly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: String,
    /// Dimension of the anomaly this addresses
    pub target: String,
    pub estimated_monthly_savings_usd: f64,
    pub effort: Effort,
    pub risk: RiskLevel,
}

/// Metric key for the number of anomalies in a report
pub const METRIC_ANOMALY_COUNT: &str = "anomaly_count";

/// Metric key for the summed recommendation savings
pub const METRIC_ESTIMATED_SAVINGS: &str = "estimated_monthly_savings_usd";

/// Terminal artifact of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPayload {
    pub title: String,
    pub summary: String,
    pub metrics: HashMap<String, f64>,
    pub anomalies: Vec<Anomaly>,
    pub recommendations: Vec<Recommendation>,
}

impl ReportPayload {
    pub fn anomaly_count(&self) -> f64 {
        self.metrics.get(METRIC_ANOMALY_COUNT).copied().unwrap_or(0.0)
    }

    pub fn estimated_monthly_savings_usd(&self) -> f64 {
        self.metrics
            .get(METRIC_ESTIMATED_SAVINGS)
            .copied()
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DAY_FORMAT).unwrap()
    }

    #[test]
    fn test_dimension_key() {
        let dim = Dimension::new("prod", "AmazonEC2");
        assert_eq!(dim.as_str(), "prod:AmazonEC2");
        assert_eq!(dim.service(), "AmazonEC2");
        assert_eq!(dim.to_string(), "prod:AmazonEC2");
    }

    #[test]
    fn test_cost_point_from_row() {
        let row = RawCostRow::new("2026-01-05", "prod", "AmazonS3", "platform", 12.5);
        let point = CostPoint::from_row(0, &row).unwrap();
        assert_eq!(point.day, day("2026-01-05"));
        assert_eq!(point.dimension().as_str(), "prod:AmazonS3");
        assert_eq!(point.cost_usd, 12.5);
    }

    #[test]
    fn test_cost_point_rejects_bad_day() {
        let row = RawCostRow::new("05/01/2026", "prod", "AmazonS3", "platform", 1.0);
        match CostPoint::from_row(4, &row).unwrap_err() {
            GuardError::DataParse {
                row,
                dimension,
                value,
                ..
            } => {
                assert_eq!(row, 4);
                assert_eq!(dimension, "prod:AmazonS3");
                assert_eq!(value, "05/01/2026");
            }
            other => panic!("Expected DataParse, got {other:?}"),
        }
    }

    #[test]
    fn test_cost_point_rejects_missing_day() {
        let row = RawCostRow::cost_only(1.0);
        assert!(matches!(
            CostPoint::from_row(0, &row),
            Err(GuardError::DataParse { .. })
        ));
    }

    #[test]
    fn test_cost_point_rejects_negative_cost() {
        let row = RawCostRow::new("2026-01-05", "prod", "AmazonS3", "platform", -3.0);
        assert!(matches!(
            CostPoint::from_row(0, &row),
            Err(GuardError::InvalidCost { .. })
        ));
    }

    #[test]
    fn test_raw_row_missing_fields_deserialize() {
        let row: RawCostRow = serde_json::from_str(r#"{"cost_usd": 4100.0}"#).unwrap();
        assert_eq!(row, RawCostRow::cost_only(4100.0));
        assert_eq!(row.dimension().as_str(), "unknown:unknown");
    }

    #[test]
    fn test_evaluation_window_trailing() {
        let mut series = TimeSeries::new(Dimension::new("a", "b"));
        for i in 1..=5 {
            series.push(day(&format!("2026-01-0{i}")), i as f64);
        }

        let (baseline, evaluated) = series.evaluation_window(2).unwrap();
        assert_eq!(baseline.len(), 2);
        assert_eq!(baseline[0].1, 3.0);
        assert_eq!(evaluated, (day("2026-01-05"), 5.0));

        // Window wider than the series takes everything
        let (baseline, evaluated) = series.evaluation_window(50).unwrap();
        assert_eq!(baseline.len(), 4);
        assert_eq!(evaluated.1, 5.0);

        assert!(TimeSeries::new(Dimension::new("a", "b"))
            .evaluation_window(3)
            .is_none());
    }

    #[test]
    fn test_sort_by_day_is_stable() {
        let mut series = TimeSeries::new(Dimension::new("a", "b"));
        series.push(day("2026-01-02"), 1.0);
        series.push(day("2026-01-01"), 2.0);
        series.push(day("2026-01-02"), 3.0);
        series.sort_by_day();

        let costs: Vec<f64> = series.points.iter().map(|(_, c)| *c).collect();
        assert_eq!(costs, vec![2.0, 1.0, 3.0]);
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"high\"");
        assert_eq!(serde_json::to_string(&Effort::Medium).unwrap(), "\"medium\"");
        assert_eq!(serde_json::to_string(&RiskLevel::Low).unwrap(), "\"low\"");
    }

    #[test]
    fn test_confidence_clamping() {
        assert_eq!(Confidence::new(1.5).value(), 1.0);
        assert_eq!(Confidence::new(-0.5).value(), 0.0);
        assert_eq!(Confidence::new(f64::NAN).value(), 0.0);
        assert!(Confidence::new(0.85).is_high());
    }
}
