//! Cost anomaly analysis
//!
//! - [`anomaly_detector`]: rolling-baseline z-score detection per dimension
//! - [`stats`]: baseline statistics and rounding

pub mod anomaly_detector;
pub mod stats;

pub use anomaly_detector::{
    AnomalyDetector, Detection, DetectionStats, HIGH_SEVERITY_MARGIN, ZERO_BASELINE_PCT,
    ZERO_VARIANCE_SCORE,
};
