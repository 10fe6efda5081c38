//! HTTP-тесты: валидация запросов и эндпоинты, которым не нужна БД.

mod common;

use axum::http::{header, StatusCode};
use common::{test_config, test_server};
use serde_json::{json, Value};

// ============================================================================
// Service routes
// ============================================================================

#[tokio::test]
async fn health_and_banner() {
    let server = test_server(test_config(None));

    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("OK");

    server.get("/").await.assert_status_ok();
}

// ============================================================================
// Seat lookup
// ============================================================================

#[tokio::test]
async fn seat_lookup_rejects_blank_query() {
    let server = test_server(test_config(None));

    let response = server
        .post("/api/seat-lookup")
        .json(&json!({ "query": "   ", "hostUserId": 42 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "query must not be blank");
}

#[tokio::test]
async fn seat_lookup_rejects_invalid_host_and_limit() {
    let server = test_server(test_config(None));

    server
        .post("/api/seat-lookup")
        .json(&json!({ "query": "smith", "hostUserId": 0 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .post("/api/seat-lookup")
        .json(&json!({ "query": "smith", "hostUserId": 42, "limit": 500 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let long_query = "a".repeat(101);
    server
        .post("/api/seat-lookup")
        .json(&json!({ "query": long_query, "hostUserId": 42 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

// ============================================================================
// Queries
// ============================================================================

#[tokio::test]
async fn execute_sql_rejects_writes_before_touching_the_database() {
    let server = test_server(test_config(None));

    for sql in [
        "DELETE FROM payments",
        "SELECT 1; DROP TABLE payments",
        "WITH gone AS (DELETE FROM payments RETURNING *) SELECT * FROM gone",
        "SELECT * INTO backup FROM payments",
    ] {
        let response = server.post("/api/execute-sql").json(&json!({ "sql": sql })).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false, "{}", sql);
    }
}

#[tokio::test]
async fn execute_sql_rejects_empty_statement() {
    let server = test_server(test_config(None));

    let response = server.post("/api/execute-sql").json(&json!({ "sql": " ;; " })).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "query rejected: statement is empty");
}

#[tokio::test]
async fn form_query_rejects_inverted_ranges() {
    let server = test_server(test_config(None));

    let response = server
        .post("/api/form-query")
        .json(&json!({ "amountMin": 100, "amountMax": 10 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/form-query")
        .json(&json!({ "dateFrom": "2024-05-01", "dateTo": "2024-04-01" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn form_query_rejects_payment_filters_on_other_tables() {
    let server = test_server(test_config(None));

    let response = server
        .post("/api/form-query")
        .json(&json!({ "table": "events", "status": "failed" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(
        body["error"],
        "query rejected: filter 'status' is not supported for table events"
    );
}

#[tokio::test]
async fn nl_to_sql_returns_parameterized_query_without_executing() {
    let server = test_server(test_config(None));

    let response = server
        .post("/api/nl-to-sql")
        .json(&json!({
            "prompt": "failed visa payments over $100 last 7 days",
            "hostUserId": 42,
            "today": "2024-06-15"
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["filters"]["status"], "failed");
    assert_eq!(body["filters"]["cardType"], "visa");
    assert_eq!(body["filters"]["amountMin"], 100.0);
    assert_eq!(body["filters"]["dateFrom"], "2024-06-08");

    let sql = body["sql"].as_str().unwrap();
    assert!(sql.contains("e.user_id = $1"));
    assert!(!sql.contains("visa"));
    assert!(body.get("rows").is_none());
    assert_eq!(body["params"][0], 42);
}

#[tokio::test]
async fn nl_to_sql_requires_a_prompt() {
    let server = test_server(test_config(None));

    server
        .post("/api/nl-to-sql")
        .json(&json!({ "prompt": "" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

// ============================================================================
// ZIP lookup
// ============================================================================

#[tokio::test]
async fn fetch_zip_without_configured_api_is_a_client_error() {
    let server = test_server(test_config(None));

    let response = server
        .post("/api/fetch-zip")
        .json(&json!({ "transactionIds": ["txn_1"] }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "ZIP lookup API is not configured");
}

#[tokio::test]
async fn fetch_zip_requires_ids() {
    let server = test_server(test_config(Some("http://127.0.0.1:1".to_string())));

    server
        .post("/api/fetch-zip")
        .json(&json!({ "transactionIds": [] }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

// ============================================================================
// Result processing
// ============================================================================

fn sample_rows() -> Value {
    json!([
        { "id": 1, "amount": 1250.5, "status": "succeeded", "created_at": "2024-06-10T09:30:00", "first_name": "Ada", "last_name": "Lovelace" },
        { "id": 2, "amount": 20, "status": "failed", "created_at": "2024-06-15T18:00:00", "first_name": null, "last_name": " " },
        { "id": 3, "amount": 75, "status": "succeeded", "created_at": "2024-07-01T12:00:00" }
    ])
}

#[tokio::test]
async fn process_filters_by_bucket_and_adds_display_fields() {
    let server = test_server(test_config(None));

    let response = server
        .post("/api/process")
        .json(&json!({ "rows": sample_rows(), "bucket": "past", "today": "2024-06-15" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["count"], 1);
    let row = &body["rows"][0];
    assert_eq!(row["id"], 1);
    assert_eq!(row["amountDisplay"], "$1,250.50");
    assert_eq!(row["createdAtDisplay"], "Jun 10, 2024 9:30 AM");
    assert_eq!(row["payerName"], "Ada Lovelace");
}

#[tokio::test]
async fn process_uses_unknown_for_blank_names() {
    let server = test_server(test_config(None));

    let response = server
        .post("/api/process")
        .json(&json!({ "rows": sample_rows(), "bucket": "today", "today": "2024-06-15" }))
        .await;

    let body: Value = response.json();
    assert_eq!(body["count"], 1);
    assert_eq!(body["rows"][0]["payerName"], "Unknown");
}

#[tokio::test]
async fn chart_picks_preset_from_prompt() {
    let server = test_server(test_config(None));

    let response = server
        .post("/api/chart")
        .json(&json!({ "rows": sample_rows(), "prompt": "status breakdown" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["preset"], "status_breakdown");
    assert_eq!(body["labels"], json!(["succeeded", "failed"]));
    assert_eq!(body["series"][0]["values"], json!([2.0, 1.0]));
}

#[tokio::test]
async fn export_returns_csv_attachment() {
    let server = test_server(test_config(None));

    let response = server
        .post("/api/export")
        .json(&json!({
            "rows": sample_rows(),
            "columns": ["id", "status"],
            "bucket": "future",
            "today": "2024-06-15"
        }))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.header(header::CONTENT_TYPE).to_str().unwrap(),
        "text/csv; charset=utf-8"
    );
    let disposition = response.header(header::CONTENT_DISPOSITION);
    let disposition = disposition.to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"export-"));
    assert!(disposition.ends_with(".csv\""));
    assert_eq!(response.text(), "\"id\",\"status\"\n\"3\",\"succeeded\"\n");
}
