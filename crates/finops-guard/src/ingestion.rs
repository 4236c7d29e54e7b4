//! Cost ingestion boundary
//!
//! [`CostSource`] is the seam to the upstream billing API. [`CostSeriesStore`]
//! is the in-memory implementation used for tests, replays and embedding
//! programs that fetch rows themselves.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::GuardResult;
use crate::model::{Dimension, RawCostRow, DAY_FORMAT};

/// Provider of daily cost rows
#[async_trait]
pub trait CostSource: Send + Sync + Debug {
    /// Fetch rows covering the last `lookback_days` days, in upstream order.
    ///
    /// An `Err` here does not abort a pipeline run; the run continues on an
    /// empty dataset.
    async fn fetch_costs(&self, lookback_days: u32) -> GuardResult<Vec<RawCostRow>>;

    /// Source name for logs
    fn name(&self) -> &str {
        "cost-source"
    }
}

/// In-memory collection of raw daily cost rows
#[derive(Debug, Clone)]
pub struct CostSeriesStore {
    rows: Arc<RwLock<Vec<RawCostRow>>>,
    as_of: NaiveDate,
}

impl Default for CostSeriesStore {
    fn default() -> Self {
        Self::new(Utc::now().date_naive())
    }
}

impl CostSeriesStore {
    /// Create an empty store whose lookback window ends at `as_of`
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            rows: Arc::new(RwLock::new(Vec::new())),
            as_of,
        }
    }

    /// Create a store pre-filled with `rows`
    pub fn with_rows(as_of: NaiveDate, rows: Vec<RawCostRow>) -> Self {
        Self {
            rows: Arc::new(RwLock::new(rows)),
            as_of,
        }
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub async fn insert(&self, row: RawCostRow) {
        self.rows.write().await.push(row);
    }

    pub async fn extend<I>(&self, rows: I)
    where
        I: IntoIterator<Item = RawCostRow>,
    {
        self.rows.write().await.extend(rows);
    }

    /// Snapshot of all rows in insertion order
    pub async fn rows(&self) -> Vec<RawCostRow> {
        self.rows.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.rows.write().await.clear();
    }

    /// Distinct dimensions, sorted
    pub async fn dimensions(&self) -> Vec<Dimension> {
        let rows = self.rows.read().await;
        rows.iter()
            .map(RawCostRow::dimension)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Whether a row falls on or after `cutoff`. Rows without a parseable day
    /// are kept so later stages can default or reject them.
    fn within_lookback(row: &RawCostRow, cutoff: NaiveDate) -> bool {
        match row
            .day
            .as_deref()
            .and_then(|day| NaiveDate::parse_from_str(day.trim(), DAY_FORMAT).ok())
        {
            Some(day) => day >= cutoff,
            None => true,
        }
    }
}

#[async_trait]
impl CostSource for CostSeriesStore {
    async fn fetch_costs(&self, lookback_days: u32) -> GuardResult<Vec<RawCostRow>> {
        let rows = self.rows.read().await;

        let Some(cutoff) = self
            .as_of
            .checked_sub_signed(Duration::days(i64::from(lookback_days)))
        else {
            return Ok(rows.clone());
        };

        let selected: Vec<RawCostRow> = rows
            .iter()
            .filter(|row| Self::within_lookback(row, cutoff))
            .cloned()
            .collect();

        debug!(
            total = rows.len(),
            selected = selected.len(),
            %cutoff,
            "Fetched cost rows from memory"
        );

        Ok(selected)
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
