//! Pipeline configuration loading and validation.
//!
//! Configuration is read from YAML. Every option has a default, so an empty
//! document is a valid configuration:
//!
//! ```yaml
//! thresholds:
//!   min_absolute_delta_usd: 5.0
//!   anomaly_zscore: 2.5
//!   min_history_points: 7
//!   baseline_days: 14
//! aws:
//!   lookback_days: 90
//! notification:
//!   webhook_url: https://example.webhook.office.com/...
//!   timeout_secs: 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{GuardError, GuardResult};

/// Environment variable consulted by [`GuardConfig::apply_env_overrides`]
pub const WEBHOOK_URL_ENV: &str = "TEAMS_WEBHOOK_URL";

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuardConfig {
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
}

/// Anomaly detection thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Minimum raw cost increase (USD) before a day is considered at all
    #[serde(default = "default_min_absolute_delta_usd")]
    pub min_absolute_delta_usd: f64,

    /// Minimum z-score for a day to be flagged
    #[serde(default = "default_anomaly_zscore")]
    pub anomaly_zscore: f64,

    /// Minimum number of baseline observations per dimension
    #[serde(default = "default_min_history_points")]
    pub min_history_points: usize,

    /// Width of the trailing baseline window, excluding the evaluated day
    #[serde(default = "default_baseline_days")]
    pub baseline_days: usize,
}

fn default_min_absolute_delta_usd() -> f64 {
    5.0
}

fn default_anomaly_zscore() -> f64 {
    2.5
}

fn default_min_history_points() -> usize {
    7
}

fn default_baseline_days() -> usize {
    14
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min_absolute_delta_usd: default_min_absolute_delta_usd(),
            anomaly_zscore: default_anomaly_zscore(),
            min_history_points: default_min_history_points(),
            baseline_days: default_baseline_days(),
        }
    }
}

impl ThresholdConfig {
    /// Validate threshold ranges
    pub fn validate(&self) -> GuardResult<()> {
        if !self.min_absolute_delta_usd.is_finite() || self.min_absolute_delta_usd < 0.0 {
            return Err(GuardError::config(format!(
                "thresholds.min_absolute_delta_usd must be a non-negative number, got {}",
                self.min_absolute_delta_usd
            )));
        }

        if !self.anomaly_zscore.is_finite() || self.anomaly_zscore <= 0.0 {
            return Err(GuardError::config(format!(
                "thresholds.anomaly_zscore must be greater than 0, got {}",
                self.anomaly_zscore
            )));
        }

        if self.min_history_points == 0 {
            return Err(GuardError::config(
                "thresholds.min_history_points must be at least 1",
            ));
        }

        if self.baseline_days == 0 {
            return Err(GuardError::config(
                "thresholds.baseline_days must be at least 1",
            ));
        }

        Ok(())
    }
}

/// Settings consumed by the cost ingestion collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwsConfig {
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

fn default_lookback_days() -> u32 {
    90
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
        }
    }
}

/// Chat webhook settings. No `webhook_url` means notification is skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_list_items")]
    pub max_list_items: usize,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_list_items() -> usize {
    5
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: default_timeout_secs(),
            max_list_items: default_max_list_items(),
        }
    }
}

impl NotificationConfig {
    /// Webhook URL, treating an empty string as unset
    pub fn webhook(&self) -> Option<&str> {
        self.webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

impl GuardConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> GuardResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            GuardError::config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(content: &str) -> GuardResult<Self> {
        // An empty document deserializes to unit, not to a mapping
        let config: GuardConfig = if content.trim().is_empty() {
            GuardConfig::default()
        } else {
            serde_yaml::from_str(content)
                .map_err(|e| GuardError::config(format!("Failed to parse config: {e}")))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the whole configuration
    pub fn validate(&self) -> GuardResult<()> {
        self.thresholds.validate()?;

        if self.aws.lookback_days == 0 {
            return Err(GuardError::config("aws.lookback_days must be at least 1"));
        }

        if self.notification.timeout_secs == 0 {
            return Err(GuardError::config(
                "notification.timeout_secs must be at least 1",
            ));
        }

        if let Some(url) = self.notification.webhook() {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(GuardError::config(format!(
                    "notification.webhook_url must be an http(s) URL, got '{url}'"
                )));
            }
        }

        Ok(())
    }

    /// Apply environment variable overrides.
    ///
    /// Only called explicitly by the embedding program; the pipeline itself
    /// never reads process state.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(WEBHOOK_URL_ENV) {
            if !url.trim().is_empty() {
                self.notification.webhook_url = Some(url.trim().to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = GuardConfig::default();
        assert_eq!(config.thresholds.min_absolute_delta_usd, 5.0);
        assert_eq!(config.thresholds.anomaly_zscore, 2.5);
        assert_eq!(config.thresholds.min_history_points, 7);
        assert_eq!(config.thresholds.baseline_days, 14);
        assert_eq!(config.aws.lookback_days, 90);
        assert_eq!(config.notification.webhook(), None);
        assert_eq!(config.notification.timeout_secs, 10);
        assert_eq!(config.notification.max_list_items, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = GuardConfig::from_yaml("").unwrap();
        assert_eq!(config, GuardConfig::default());
    }

    #[test]
    fn test_partial_thresholds() {
        let yaml = r#"
thresholds:
  anomaly_zscore: 2.0
  min_absolute_delta_usd: 2
  min_history_points: 5
  baseline_days: 10
aws:
  lookback_days: 90
"#;
        let config = GuardConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.thresholds.anomaly_zscore, 2.0);
        assert_eq!(config.thresholds.min_absolute_delta_usd, 2.0);
        assert_eq!(config.thresholds.min_history_points, 5);
        assert_eq!(config.thresholds.baseline_days, 10);
        assert_eq!(config.notification, NotificationConfig::default());
    }

    #[test]
    fn test_malformed_yaml_is_configuration_error() {
        let err = GuardConfig::from_yaml("thresholds: [not, a, mapping").unwrap_err();
        assert!(matches!(err, GuardError::Configuration { .. }));
    }

    #[test]
    fn test_wrong_type_is_configuration_error() {
        let err = GuardConfig::from_yaml("thresholds:\n  min_history_points: lots\n").unwrap_err();
        assert!(matches!(err, GuardError::Configuration { .. }));
    }

    #[test]
    fn test_threshold_validation() {
        let mut thresholds = ThresholdConfig::default();
        thresholds.anomaly_zscore = 0.0;
        assert!(thresholds.validate().is_err());

        let mut thresholds = ThresholdConfig::default();
        thresholds.min_absolute_delta_usd = -1.0;
        assert!(thresholds.validate().is_err());

        let mut thresholds = ThresholdConfig::default();
        thresholds.min_absolute_delta_usd = f64::NAN;
        assert!(thresholds.validate().is_err());

        let mut thresholds = ThresholdConfig::default();
        thresholds.min_history_points = 0;
        assert!(thresholds.validate().is_err());

        let mut thresholds = ThresholdConfig::default();
        thresholds.baseline_days = 0;
        assert!(thresholds.validate().is_err());

        let mut thresholds = ThresholdConfig::default();
        thresholds.min_absolute_delta_usd = 0.0;
        assert!(thresholds.validate().is_ok());
    }

    #[test]
    fn test_webhook_validation() {
        let yaml = "notification:\n  webhook_url: ftp://example.com/hook\n";
        assert!(GuardConfig::from_yaml(yaml).is_err());

        let yaml = "notification:\n  webhook_url: \"  \"\n";
        let config = GuardConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.notification.webhook(), None);

        let yaml = "notification:\n  webhook_url: https://example.com/hook\n";
        let config = GuardConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.notification.webhook(), Some("https://example.com/hook"));
    }

    #[test]
    fn test_env_override_sets_webhook() {
        // Only test in the crate touching this variable
        std::env::set_var(WEBHOOK_URL_ENV, "https://example.com/webhook");
        let mut config = GuardConfig::default();
        config.apply_env_overrides();
        std::env::remove_var(WEBHOOK_URL_ENV);

        assert_eq!(
            config.notification.webhook(),
            Some("https://example.com/webhook")
        );

        let mut config = GuardConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.notification.webhook(), None);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "thresholds:\n  baseline_days: 21").unwrap();

        let config = GuardConfig::from_file(file.path()).unwrap();
        assert_eq!(config.thresholds.baseline_days, 21);
        assert_eq!(config.thresholds.min_history_points, 7);
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = GuardConfig::from_file("/nonexistent/finops/config.yaml").unwrap_err();
        match err {
            GuardError::Configuration { message } => {
                assert!(message.contains("/nonexistent/finops/config.yaml"))
            }
            other => panic!("Expected Configuration error, got {other:?}"),
        }
    }
}
