//! End-to-end scan against a local eBay stand-in.
//!
//! Uses `wiremock` to serve search result pages so the real HTTP client,
//! HTML price extraction, estimator and JSON store all run together
//! without network access.

use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pricewatch::config::SourceConfig;
use pricewatch::engine::clock::ManualClock;
use pricewatch::engine::scanner::Scanner;
use pricewatch::estimator::EstimationParameters;
use pricewatch::sources::ebay::EbayClient;
use pricewatch::storage::JsonResultStore;
use pricewatch::types::ScanOutcome;

fn results_page(prices: &[f64]) -> String {
    let items: String = prices
        .iter()
        .map(|p| {
            format!(
                r#"<li class="s-item"><div class="s-item__info"><span class="s-item__price">${p:.2}</span></div></li>"#
            )
        })
        .collect();
    format!("<!DOCTYPE html><html><body><ul class=\"srp-results\">{items}</ul></body></html>")
}

async fn mount_term(server: &MockServer, term: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/sch/i.html"))
        .and(query_param("_nkw", term))
        .respond_with(template)
        .expect(1)
        .mount(server)
        .await;
}

fn ebay(server: &MockServer) -> EbayClient {
    let config = SourceConfig {
        base_url: server.uri(),
        timeout_secs: 5,
        ..SourceConfig::default()
    };
    EbayClient::new(&config).unwrap()
}

#[tokio::test]
async fn scan_skips_failing_terms_and_saves_the_rest() {
    let server = MockServer::start().await;

    let mut gpu = vec![450.0; 9];
    gpu.extend([440.0, 460.0, 5.0, 4000.0]);
    mount_term(&server, "rtx 3080", ResponseTemplate::new(200).set_body_string(results_page(&gpu))).await;
    mount_term(&server, "rare card", ResponseTemplate::new(200).set_body_string(results_page(&[1.0, 2.0]))).await;
    mount_term(&server, "blocked", ResponseTemplate::new(403)).await;

    let out = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()));
    let scanner = Scanner::new(
        Box::new(ebay(&server)),
        Box::new(JsonResultStore::new(out.path())),
        clock.clone(),
        EstimationParameters::default(),
        Duration::from_secs(3),
    );

    let terms: Vec<String> = ["rtx 3080", "rare card", "blocked"].iter().map(|s| s.to_string()).collect();
    let report = scanner.scan(&terms).await;

    assert_eq!(report.outcome, ScanOutcome::Succeeded);
    assert_eq!(report.estimates.len(), 1);
    let price = report.estimates.get("rtx 3080").unwrap();
    assert!((price - 450.0).abs() < 10.0, "got {price}");
    assert_eq!(report.skipped.len(), 2);
    assert_eq!(clock.total_slept(), Duration::from_secs(6));

    let path = report.saved_to.unwrap();
    assert_eq!(path, out.path().join(format!("{}.json", report.run_id)));
    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert!(raw[&report.run_id]["rtx 3080"].is_f64());
}

#[tokio::test]
async fn scan_fails_when_marketplace_is_down() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()));
    let scanner = Scanner::new(
        Box::new(ebay(&server)),
        Box::new(JsonResultStore::new(out.path().join("prices"))),
        clock,
        EstimationParameters::default(),
        Duration::from_secs(3),
    );

    let report = scanner.scan(&["a".to_string(), "b".to_string()]).await;

    assert_eq!(report.outcome, ScanOutcome::Failed);
    assert!(report.estimates.is_empty());
    assert!(!out.path().join("prices").exists());
}
