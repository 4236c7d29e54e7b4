//! Report delivery
//!
//! [`NotificationSink`] delivers a finished report. A missing sink is not an
//! error: the run reports [`DeliveryStatus::NotConfigured`] and still returns
//! its report.

pub mod teams;

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::{GuardError, GuardResult};
use crate::model::ReportPayload;

pub use teams::{format_usd, render_message_card, to_bullets, TeamsNotifier, NONE_PLACEHOLDER};

/// Destination for a finished report
#[async_trait]
pub trait NotificationSink: Send + Sync + Debug {
    /// Deliver the report once. No retry.
    async fn deliver(&self, report: &ReportPayload) -> GuardResult<()>;

    /// Sink name for logs
    fn name(&self) -> &str {
        "notification-sink"
    }
}

/// Outcome of the notification stage
#[derive(Debug)]
pub enum DeliveryStatus {
    Delivered,
    /// No destination configured; delivery skipped
    NotConfigured,
    Failed(GuardError),
}

impl DeliveryStatus {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DeliveryStatus::Failed(_))
    }

    pub fn error(&self) -> Option<&GuardError> {
        match self {
            DeliveryStatus::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Metric/log label
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::NotConfigured => "not_configured",
            DeliveryStatus::Failed(_) => "failed",
        }
    }
}

impl From<GuardResult<()>> for DeliveryStatus {
    fn from(result: GuardResult<()>) -> Self {
        match result {
            Ok(()) => DeliveryStatus::Delivered,
            Err(err) => DeliveryStatus::Failed(err),
        }
    }
}
