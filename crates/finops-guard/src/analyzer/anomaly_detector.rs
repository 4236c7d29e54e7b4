//! Anomaly Detector
//!
//! Flags upward daily cost spikes per `account:service` dimension against a
//! trailing baseline. For each dimension only the latest day is evaluated:
//!
//! 1. Points are sorted by day (stable) and the trailing `baseline_days + 1`
//!    points form the window; the last one is the evaluated day.
//! 2. A dimension needs more than `min_history_points` points in total, and at
//!    least `min_history_points` in the baseline.
//! 3. The increase over the baseline mean must reach `min_absolute_delta_usd`
//!    and its z-score (population std dev) must reach `anomaly_zscore`.
//!    A perfectly flat baseline scores [`ZERO_VARIANCE_SCORE`] and is flagged on
//!    any positive increase that passes the absolute gate.
//!
//! Delta and score are rounded to cents before they are compared, so an emitted
//! anomaly never shows a value below the threshold that admitted it.
//!
//! The detector holds no mutable state and performs no I/O.

use std::collections::HashMap;
use tracing::{debug, info, trace};

use super::stats::{mean, population_std_dev, round2};
use crate::config::ThresholdConfig;
use crate::error::GuardResult;
use crate::model::{Anomaly, CostPoint, Dimension, RawCostRow, Severity, TimeSeries};

/// Score assigned when the baseline has zero variance
pub const ZERO_VARIANCE_SCORE: f64 = 10.0;

/// Margin above the z-score threshold at which an anomaly becomes high severity
pub const HIGH_SEVERITY_MARGIN: f64 = 1.0;

/// Percentage reported when the baseline mean is zero
pub const ZERO_BASELINE_PCT: f64 = 100.0;

/// Counters describing one detection pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionStats {
    /// Cost points considered
    pub points: usize,
    /// Distinct dimensions
    pub groups: usize,
    /// Dimensions with no more than `min_history_points` points
    pub insufficient_history: usize,
    /// Dimensions whose baseline window was shorter than `min_history_points`
    pub short_window: usize,
    /// Dimensions whose increase stayed below the absolute threshold
    pub below_delta: usize,
    /// Dimensions whose z-score stayed below the threshold
    pub below_score: usize,
    /// Flat baselines with no increase
    pub no_deviation: usize,
    /// Anomalies emitted
    pub anomalies: usize,
}

/// Result of a detection pass
#[derive(Debug, Clone, Default)]
pub struct Detection {
    /// Anomalies ordered by score, highest first
    pub anomalies: Vec<Anomaly>,
    pub stats: DetectionStats,
}

/// Why a dimension did or did not produce an anomaly
#[derive(Debug, Clone, PartialEq)]
enum Evaluation {
    Flagged(Anomaly),
    InsufficientHistory,
    ShortWindow,
    BelowDelta,
    BelowScore,
    NoDeviation,
}

/// Rolling-baseline z-score detector
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    config: ThresholdConfig,
}

impl AnomalyDetector {
    /// Create a detector, validating the thresholds
    pub fn new(config: ThresholdConfig) -> GuardResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Create with default thresholds
    pub fn with_defaults() -> Self {
        Self {
            config: ThresholdConfig::default(),
        }
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// Detect anomalies in normalized rows.
    ///
    /// # Errors
    ///
    /// Fails on the first row whose day is missing or unparseable, or whose
    /// cost is negative or non-finite. No partial result is returned.
    pub fn detect(&self, rows: &[RawCostRow]) -> GuardResult<Vec<Anomaly>> {
        Ok(self.analyze(rows)?.anomalies)
    }

    /// Like [`detect`](Self::detect), also returning pass statistics
    pub fn analyze(&self, rows: &[RawCostRow]) -> GuardResult<Detection> {
        let points = rows
            .iter()
            .enumerate()
            .map(|(index, row)| CostPoint::from_row(index, row))
            .collect::<GuardResult<Vec<_>>>()?;

        Ok(self.analyze_points(points))
    }

    /// Detect anomalies in already parsed points
    pub fn detect_points(&self, points: Vec<CostPoint>) -> Vec<Anomaly> {
        self.analyze_points(points).anomalies
    }

    /// Run detection over parsed points
    pub fn analyze_points(&self, points: Vec<CostPoint>) -> Detection {
        let mut stats = DetectionStats {
            points: points.len(),
            ..Default::default()
        };

        let groups = group_by_dimension(points);
        stats.groups = groups.len();

        let mut anomalies = Vec::new();
        for mut series in groups {
            series.sort_by_day();

            match self.evaluate(&series) {
                Evaluation::Flagged(anomaly) => {
                    debug!(
                        dimension = %anomaly.dimension,
                        day = %anomaly.day,
                        delta_abs = anomaly.delta_abs,
                        score = anomaly.score,
                        severity = %anomaly.severity,
                        "Cost anomaly detected"
                    );
                    anomalies.push(anomaly);
                }
                Evaluation::InsufficientHistory => {
                    trace!(dimension = %series.dimension, points = series.len(), "Skipping: insufficient history");
                    stats.insufficient_history += 1;
                }
                Evaluation::ShortWindow => {
                    trace!(dimension = %series.dimension, "Skipping: baseline window too short");
                    stats.short_window += 1;
                }
                Evaluation::BelowDelta => stats.below_delta += 1,
                Evaluation::BelowScore => stats.below_score += 1,
                Evaluation::NoDeviation => stats.no_deviation += 1,
            }
        }

        // Stable: equal scores keep first-appearance order of their dimension
        anomalies.sort_by(|a, b| b.score.total_cmp(&a.score));
        stats.anomalies = anomalies.len();

        info!(
            points = stats.points,
            groups = stats.groups,
            anomalies = stats.anomalies,
            "Anomaly detection complete"
        );

        Detection { anomalies, stats }
    }

    /// Evaluate the latest day of one sorted series
    fn evaluate(&self, series: &TimeSeries) -> Evaluation {
        let cfg = &self.config;

        if series.len() < cfg.min_history_points.saturating_add(1) {
            return Evaluation::InsufficientHistory;
        }

        let Some((baseline, (day, evaluated_cost))) = series.evaluation_window(cfg.baseline_days)
        else {
            return Evaluation::InsufficientHistory;
        };

        if baseline.len() < cfg.min_history_points {
            return Evaluation::ShortWindow;
        }

        let costs: Vec<f64> = baseline.iter().map(|(_, cost)| *cost).collect();
        let base_mean = mean(&costs);
        let base_std = population_std_dev(&costs);

        // Gates compare the cent-rounded values that are emitted
        let delta_abs = round2(evaluated_cost - base_mean);
        if delta_abs < cfg.min_absolute_delta_usd {
            return Evaluation::BelowDelta;
        }

        let score = if base_std == 0.0 {
            if delta_abs <= 0.0 {
                return Evaluation::NoDeviation;
            }
            ZERO_VARIANCE_SCORE
        } else {
            let score = round2((evaluated_cost - base_mean) / base_std);
            if score < cfg.anomaly_zscore {
                return Evaluation::BelowScore;
            }
            score
        };

        let delta_pct = if base_mean > 0.0 {
            round2((evaluated_cost - base_mean) / base_mean * 100.0)
        } else {
            ZERO_BASELINE_PCT
        };

        let severity = if score >= cfg.anomaly_zscore + HIGH_SEVERITY_MARGIN {
            Severity::High
        } else {
            Severity::Medium
        };

        Evaluation::Flagged(Anomaly {
            day,
            dimension: series.dimension.to_string(),
            delta_abs,
            delta_pct,
            score,
            severity,
        })
    }
}

/// Group points per dimension, in order of first appearance
fn group_by_dimension(points: Vec<CostPoint>) -> Vec<TimeSeries> {
    let mut index: HashMap<Dimension, usize> = HashMap::new();
    let mut groups: Vec<TimeSeries> = Vec::new();

    for point in points {
        let dimension = point.dimension();
        let slot = match index.get(&dimension) {
            Some(&slot) => slot,
            None => {
                groups.push(TimeSeries::new(dimension.clone()));
                index.insert(dimension, groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[slot].push(point.day, point.cost_usd);
    }

    groups
}
