//! ZIP-обогащение против поддельного API провайдера.

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ticket_admin::config::ZipConfig;
use ticket_admin::services::zip_lookup::{ZipClient, ZipError};

fn zip_config(server: &MockServer) -> ZipConfig {
    ZipConfig {
        api_url: Some(format!("{}/", server.uri())),
        api_key: Some("test-key".to_string()),
        delay_ms: 0,
        timeout_seconds: 5,
    }
}

async fn mount_provider(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/transactions/txn_ok"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "txn_ok",
            "billing_details": { "address": { "postal_code": "94107" } }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/transactions/txn_flat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "zip": "10001" })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/transactions/txn_broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/transactions/txn_nozip"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "billing_details": {} })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn enrich_keeps_every_row_and_reports_failures() {
    let server = MockServer::start().await;
    mount_provider(&server).await;
    let client = ZipClient::from_config(&zip_config(&server), None).unwrap();

    let ids: Vec<String> = ["txn_ok", "txn_broken", "txn_flat", "txn_nozip", "bad id"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let out = client.enrich(&ids).await;

    let zips: Vec<(&str, Option<&str>)> = out
        .results
        .iter()
        .map(|r| (r.transaction_id.as_str(), r.zip.as_deref()))
        .collect();
    assert_eq!(
        zips,
        vec![
            ("txn_ok", Some("94107")),
            ("txn_broken", None),
            ("txn_flat", Some("10001")),
            ("txn_nozip", None),
            ("bad id", None),
        ]
    );

    let failed: Vec<&str> = out.errors.iter().map(|e| e.transaction_id.as_str()).collect();
    assert_eq!(failed, vec!["txn_broken", "txn_nozip", "bad id"]);
    assert_eq!(out.errors[0].error, "lookup returned HTTP 500");
    assert_eq!(out.errors[1].error, "no postal code in response");
}

#[tokio::test]
async fn fetch_zip_maps_status_errors() {
    let server = MockServer::start().await;
    mount_provider(&server).await;
    let client = ZipClient::from_config(&zip_config(&server), None).unwrap();

    assert_eq!(client.fetch_zip("txn_ok").await.unwrap(), "94107");
    assert!(matches!(client.fetch_zip("txn_broken").await, Err(ZipError::Status(500))));
    // неизвестная транзакция: wiremock отвечает 404
    assert!(matches!(client.fetch_zip("txn_missing").await, Err(ZipError::Status(404))));
}

#[tokio::test]
async fn fetch_zip_endpoint_returns_results_and_errors() {
    let server = MockServer::start().await;
    mount_provider(&server).await;
    let app = common::test_server(common::test_config(Some(server.uri())));

    let response = app
        .post("/api/fetch-zip")
        .json(&json!({ "transactionIds": ["txn_ok", "txn_broken"] }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(
        body["results"],
        json!([
            { "transactionId": "txn_ok", "zip": "94107" },
            { "transactionId": "txn_broken", "zip": null }
        ])
    );
    assert_eq!(body["errors"][0]["transactionId"], "txn_broken");
}
