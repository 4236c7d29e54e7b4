//! Microsoft Teams incoming-webhook notifier
//!
//! Renders the report as a legacy `MessageCard`:
//!
//! ```json
//! {
//!   "@type": "MessageCard",
//!   "@context": "https://schema.org/extensions",
//!   "summary": "<title>",
//!   "themeColor": "0078D7",
//!   "title": "<title>",
//!   "sections": [
//!     { "text": "<summary>", "facts": [ {"name": "Anomaly count", "value": "2"}, ... ] },
//!     { "title": "Top anomalies", "text": "- prod:AmazonEC2\n- ..." },
//!     { "title": "Recommended actions", "text": "- ..." }
//!   ]
//! }
//! ```

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::NotificationSink;
use crate::config::NotificationConfig;
use crate::error::{GuardError, GuardResult};
use crate::model::ReportPayload;

/// Bullet list text used when a list is empty
pub const NONE_PLACEHOLDER: &str = "- none";

const THEME_COLOR: &str = "0078D7";

/// Longest response body kept in a delivery error
const MAX_ERROR_BODY: usize = 512;

/// Bulleted list, one `- item` per line, capped at `max_items`
pub fn to_bullets<'a, I>(items: I, max_items: usize) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let lines: Vec<String> = items
        .into_iter()
        .take(max_items)
        .map(|item| format!("- {item}"))
        .collect();

    if lines.is_empty() {
        NONE_PLACEHOLDER.to_string()
    } else {
        lines.join("\n")
    }
}

/// US dollar amount with thousands separators, e.g. `$1,234.56`
pub fn format_usd(value: f64) -> String {
    if !value.is_finite() {
        return format!("${value}");
    }

    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    // "-0.00" reads oddly; only show the sign for a visible amount
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

/// Render the report as a Teams `MessageCard`
pub fn render_message_card(report: &ReportPayload, max_items: usize) -> Value {
    // Truncation toward zero, matching an integer count
    let anomaly_count = report.anomaly_count() as i64;

    json!({
        "@type": "MessageCard",
        "@context": "https://schema.org/extensions",
        "summary": report.title,
        "themeColor": THEME_COLOR,
        "title": report.title,
        "sections": [
            {
                "text": report.summary,
                "facts": [
                    { "name": "Anomaly count", "value": anomaly_count.to_string() },
                    {
                        "name": "Estimated monthly savings",
                        "value": format_usd(report.estimated_monthly_savings_usd()),
                    },
                ],
            },
            {
                "title": "Top anomalies",
                "text": to_bullets(report.anomalies.iter().map(|a| a.dimension.as_str()), max_items),
            },
            {
                "title": "Recommended actions",
                "text": to_bullets(report.recommendations.iter().map(|r| r.action.as_str()), max_items),
            },
        ],
    })
}

/// Posts reports to a Teams incoming webhook
#[derive(Debug, Clone)]
pub struct TeamsNotifier {
    webhook_url: String,
    timeout: Duration,
    max_list_items: usize,
    client: reqwest::Client,
}

impl TeamsNotifier {
    /// Create a notifier for `webhook_url`.
    ///
    /// # Errors
    ///
    /// Returns `GuardError::Configuration` if the HTTP client cannot be created.
    pub fn new(
        webhook_url: impl Into<String>,
        timeout_secs: u64,
        max_list_items: usize,
    ) -> GuardResult<Self> {
        let timeout = Duration::from_secs(timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GuardError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            webhook_url: webhook_url.into(),
            timeout,
            max_list_items,
            client,
        })
    }

    /// Build from configuration. `Ok(None)` when no webhook is configured.
    pub fn from_config(config: &NotificationConfig) -> GuardResult<Option<Self>> {
        match config.webhook() {
            Some(url) => Ok(Some(Self::new(
                url,
                config.timeout_secs,
                config.max_list_items,
            )?)),
            None => {
                info!("Teams webhook not configured, notifications disabled");
                Ok(None)
            }
        }
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn timeout_error(&self) -> GuardError {
        GuardError::DeliveryTimeout {
            timeout_secs: self.timeout.as_secs(),
        }
    }
}

#[async_trait]
impl NotificationSink for TeamsNotifier {
    async fn deliver(&self, report: &ReportPayload) -> GuardResult<()> {
        let card = render_message_card(report, self.max_list_items);

        debug!(
            anomalies = report.anomalies.len(),
            recommendations = report.recommendations.len(),
            "Posting report to Teams webhook"
        );

        let response = tokio::time::timeout(
            self.timeout,
            self.client.post(&self.webhook_url).json(&card).send(),
        )
        .await
        .map_err(|_: tokio::time::error::Elapsed| self.timeout_error())?
        .map_err(|e: reqwest::Error| {
            if e.is_timeout() {
                self.timeout_error()
            } else {
                GuardError::Delivery {
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status.is_success() {
            info!(status = status.as_u16(), "Report delivered to Teams");
            return Ok(());
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }

        warn!(status = status.as_u16(), "Teams webhook rejected report");
        Err(GuardError::DeliveryStatus {
            status: status.as_u16(),
            body,
        })
    }

    fn name(&self) -> &str {
        "teams"
    }
}
