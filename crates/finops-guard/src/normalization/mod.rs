//! Cost row normalization
//!
//! Fills the optional fields of raw cost rows so that every row carries a
//! day, account, service and tag before detection:
//! - `day` defaults to the run date (ISO-8601)
//! - `account` / `service` default to `"unknown"`
//! - `tag` defaults to `"unallocated"`
//!
//! Normalization never fails. A present-but-malformed day is left untouched
//! and reported later by the detector.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{RawCostRow, DAY_FORMAT, UNALLOCATED, UNKNOWN};

// ============================================================================
// Statistics
// ============================================================================

/// Counts of the defaults applied in one normalization pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationStats {
    /// Rows seen
    pub rows: usize,

    /// Rows that received the run date
    pub days_filled: usize,

    /// Rows that received the unknown account
    pub accounts_filled: usize,

    /// Rows that received the unknown service
    pub services_filled: usize,

    /// Rows that received the unallocated tag
    pub tags_filled: usize,
}

impl NormalizationStats {
    /// Total number of fields defaulted
    pub fn fields_filled(&self) -> usize {
        self.days_filled + self.accounts_filled + self.services_filled + self.tags_filled
    }

    /// Fraction of rows that needed at least a day
    pub fn day_fill_rate(&self) -> f64 {
        if self.rows > 0 {
            self.days_filled as f64 / self.rows as f64
        } else {
            0.0
        }
    }
}

// ============================================================================
// Normalizer
// ============================================================================

/// Applies field defaults to raw cost rows
#[derive(Debug, Clone)]
pub struct Normalizer {
    today: NaiveDate,
}

impl Normalizer {
    /// Create a normalizer that stamps undated rows with `today`
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Create a normalizer using the current UTC date
    pub fn for_today() -> Self {
        Self::new(Utc::now().date_naive())
    }

    /// Date applied to undated rows
    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Apply defaults in place, preserving order
    pub fn normalize(&self, rows: &mut [RawCostRow]) -> NormalizationStats {
        let today = self.today.format(DAY_FORMAT).to_string();
        let mut stats = NormalizationStats {
            rows: rows.len(),
            ..Default::default()
        };

        for row in rows.iter_mut() {
            if fill(&mut row.day, &today) {
                stats.days_filled += 1;
            }
            if fill(&mut row.account, UNKNOWN) {
                stats.accounts_filled += 1;
            }
            if fill(&mut row.service, UNKNOWN) {
                stats.services_filled += 1;
            }
            if fill(&mut row.tag, UNALLOCATED) {
                stats.tags_filled += 1;
            }
        }

        debug!(
            rows = stats.rows,
            fields_filled = stats.fields_filled(),
            days_filled = stats.days_filled,
            "Normalized cost rows"
        );

        stats
    }
}

/// Set an absent field, returning whether it was filled
fn fill(field: &mut Option<String>, default: &str) -> bool {
    if field.is_none() {
        *field = Some(default.to_string());
        true
    } else {
        false
    }
}
