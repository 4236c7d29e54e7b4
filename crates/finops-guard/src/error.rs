//! Error types for the cost review pipeline

use thiserror::Error;

/// Result type for pipeline operations
pub type GuardResult<T> = Result<T, GuardError>;

/// Errors that can occur while reviewing cloud costs
#[derive(Debug, Error)]
pub enum GuardError {
    /// Configuration is missing, malformed or out of range
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A cost row carries a day that is missing or not an ISO-8601 date
    #[error("Invalid day on row {row} ({dimension}): '{value}' - {reason}")]
    DataParse {
        row: usize,
        dimension: String,
        value: String,
        reason: String,
    },

    /// A cost row carries a negative or non-finite cost
    #[error("Invalid cost on row {row} ({dimension}): {cost}")]
    InvalidCost {
        row: usize,
        dimension: String,
        cost: f64,
    },

    /// The upstream cost source could not be reached
    #[error("Cost source unavailable: {reason}")]
    IngestionUnavailable { reason: String },

    /// Insight or recommendation stage broke its contract
    #[error("Insight generation failed: {reason}")]
    Insight { reason: String },

    /// Notification transport failure
    #[error("Notification delivery failed: {reason}")]
    Delivery { reason: String },

    /// Webhook answered with a non-success status
    #[error("Notification webhook returned {status}: {body}")]
    DeliveryStatus { status: u16, body: String },

    /// Webhook did not answer in time
    #[error("Notification delivery timed out after {timeout_secs}s")]
    DeliveryTimeout { timeout_secs: u64 },

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// YAML error
    #[error("YAML error: {source}")]
    Yaml {
        #[from]
        source: serde_yaml::Error,
    },

    /// JSON error
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl GuardError {
    /// Shorthand for a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        GuardError::Configuration {
            message: message.into(),
        }
    }

    /// Whether this error came from notification delivery
    pub fn is_delivery(&self) -> bool {
        matches!(
            self,
            GuardError::Delivery { .. }
                | GuardError::DeliveryStatus { .. }
                | GuardError::DeliveryTimeout { .. }
        )
    }

    /// Whether this error aborts a run before any report exists
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GuardError::Configuration { .. }
                | GuardError::DataParse { .. }
                | GuardError::InvalidCost { .. }
                | GuardError::Yaml { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_parse_error_display() {
        let error = GuardError::DataParse {
            row: 3,
            dimension: "prod:AmazonEC2".to_string(),
            value: "2026-13-01".to_string(),
            reason: "input is out of range".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid day on row 3 (prod:AmazonEC2): '2026-13-01' - input is out of range"
        );
    }

    #[test]
    fn test_delivery_status_error_display() {
        let error = GuardError::DeliveryStatus {
            status: 502,
            body: "Bad Gateway".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Notification webhook returned 502: Bad Gateway"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(GuardError::config("bad").is_fatal());
        assert!(!GuardError::config("bad").is_delivery());

        let timeout = GuardError::DeliveryTimeout { timeout_secs: 10 };
        assert!(timeout.is_delivery());
        assert!(!timeout.is_fatal());

        let unavailable = GuardError::IngestionUnavailable {
            reason: "throttled".to_string(),
        };
        assert!(!unavailable.is_fatal());
        assert!(!unavailable.is_delivery());
    }

    #[test]
    fn test_io_error_conversion() {
        fn may_fail() -> GuardResult<()> {
            Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "config.yaml not found",
            ))?;
            Ok(())
        }

        match may_fail().unwrap_err() {
            GuardError::Io { source } => assert!(source.to_string().contains("config.yaml")),
            other => panic!("Expected Io variant, got {other:?}"),
        }
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<GuardError>();
        assert_sync::<GuardError>();
    }
}
