//! End-to-end weekly runs against a mock Teams webhook

use chrono::{Duration, NaiveDate};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use finops_guard::{
    CostSeriesStore, DeliveryStatus, GuardConfig, GuardError, RawCostRow, Severity,
    WeeklyPipeline,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()
}

/// Ten days at `base`, then one day at `spike`, ending today
fn daily_costs(account: &str, service: &str, base: f64, spike: f64) -> Vec<RawCostRow> {
    (0..=10)
        .map(|i| {
            let day = today() - Duration::days(10 - i);
            let cost = if i == 10 { spike } else { base };
            RawCostRow::new(day.to_string(), account, service, "platform", cost)
        })
        .collect()
}

fn config_yaml(webhook: Option<&str>, timeout_secs: u64) -> GuardConfig {
    let mut yaml = String::from(
        "thresholds:\n  anomaly_zscore: 2.0\n  min_absolute_delta_usd: 2\n  min_history_points: 5\n  baseline_days: 10\n",
    );
    yaml.push_str(&format!("notification:\n  timeout_secs: {timeout_secs}\n"));
    if let Some(url) = webhook {
        yaml.push_str(&format!("  webhook_url: {url}\n"));
    }
    GuardConfig::from_yaml(&yaml).unwrap()
}

fn pipeline(config: GuardConfig, rows: Vec<RawCostRow>) -> WeeklyPipeline {
    WeeklyPipeline::builder(config)
        .source(Arc::new(CostSeriesStore::with_rows(today(), rows)))
        .today(today())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_report_delivered_as_message_card() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/webhook"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "@type": "MessageCard",
            "title": "FinOps Guard Weekly Report",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("1"))
        .expect(1)
        .mount(&server)
        .await;

    let webhook = format!("{}/webhook", server.uri());
    let mut rows = daily_costs("prod", "AmazonEC2", 10.0, 30.0);
    rows.extend(daily_costs("prod", "AmazonS3", 5.0, 5.0));

    let run = pipeline(config_yaml(Some(&webhook), 5), rows)
        .run_weekly()
        .await
        .unwrap();

    assert!(run.delivery.is_delivered());
    assert_eq!(run.report.anomalies.len(), 1);
    assert_eq!(run.report.anomalies[0].severity, Severity::High);

    let requests = server.received_requests().await.unwrap();
    let card: Value = requests[0].body_json().unwrap();
    let sections = card["sections"].as_array().unwrap();
    assert_eq!(sections[0]["facts"][0]["value"], "1");
    assert_eq!(sections[0]["facts"][1]["value"], "$285.00");
    assert_eq!(sections[1]["text"], "- prod:AmazonEC2");
    assert!(sections[2]["text"]
        .as_str()
        .unwrap()
        .starts_with("- Rightsize"));
}

#[tokio::test]
async fn test_empty_week_still_notifies() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let webhook = format!("{}/webhook", server.uri());
    let run = pipeline(config_yaml(Some(&webhook), 5), Vec::new())
        .run_weekly()
        .await
        .unwrap();

    assert!(run.delivery_result().is_ok());
    assert_eq!(run.report.anomaly_count(), 0.0);
    assert_eq!(run.report.estimated_monthly_savings_usd(), 0.0);

    let requests = server.received_requests().await.unwrap();
    let card: Value = requests[0].body_json().unwrap();
    assert_eq!(card["sections"][1]["text"], "- none");
    assert_eq!(card["sections"][2]["text"], "- none");
}

#[tokio::test]
async fn test_webhook_error_status_surfaces_after_report() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .expect(1) // no retry
        .mount(&server)
        .await;

    let webhook = format!("{}/webhook", server.uri());
    let run = pipeline(
        config_yaml(Some(&webhook), 5),
        daily_costs("prod", "AmazonEC2", 10.0, 30.0),
    )
    .run_weekly()
    .await
    .unwrap();

    match run.delivery_result() {
        Err(GuardError::DeliveryStatus { status, body }) => {
            assert_eq!(*status, 500);
            assert_eq!(body, "Internal Server Error");
        }
        other => panic!("Expected DeliveryStatus error, got {other:?}"),
    }
    assert_eq!(run.report.anomalies.len(), 1);
    assert_eq!(run.report.recommendations.len(), 1);
}

#[tokio::test]
async fn test_webhook_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(3)))
        .mount(&server)
        .await;

    let webhook = format!("{}/webhook", server.uri());
    let run = pipeline(
        config_yaml(Some(&webhook), 1),
        daily_costs("prod", "AmazonEC2", 10.0, 30.0),
    )
    .run_weekly()
    .await
    .unwrap();

    assert!(matches!(
        run.delivery,
        DeliveryStatus::Failed(GuardError::DeliveryTimeout { timeout_secs: 1 })
    ));
    assert_eq!(run.report.anomalies.len(), 1);
}

#[tokio::test]
async fn test_unreachable_webhook_is_delivery_error() {
    // Bind then drop a listener so the port refuses connections
    let uri = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        format!("http://{}", listener.local_addr().unwrap())
    };

    let run = pipeline(
        config_yaml(Some(&format!("{uri}/webhook")), 2),
        daily_costs("prod", "AmazonEC2", 10.0, 30.0),
    )
    .run_weekly()
    .await
    .unwrap();

    let err = run.delivery_result().unwrap_err();
    assert!(err.is_delivery());
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn test_no_webhook_is_not_an_error() {
    let run = pipeline(
        config_yaml(None, 5),
        daily_costs("prod", "AmazonEC2", 10.0, 30.0),
    )
    .run_weekly()
    .await
    .unwrap();

    assert!(matches!(run.delivery, DeliveryStatus::NotConfigured));
    assert!(run.delivery_result().is_ok());
    assert_eq!(run.summary_json()["anomaly_count"], 1);
}
