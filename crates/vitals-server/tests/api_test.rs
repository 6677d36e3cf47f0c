//! Router tests for the HTTP surface

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use vitals_common::types::ImportPhase;
use vitals_server::{
    features::{self, FeatureState},
    ingest::ImportRunner,
};

use common::{export_xml, steps, zip_bytes, TestEnv};

const BOUNDARY: &str = "vitals-test-boundary";

fn app(env: &TestEnv) -> (Router, Arc<ImportRunner>) {
    let runner = env.runner(5000);
    let router = features::router(FeatureState {
        db: env.pool.clone(),
        runner: Arc::clone(&runner),
    });
    (router, runner)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn upload(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: application/zip\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// `YYYY-MM-DD` for `days_ago` days before today (UTC)
fn day(days_ago: i64) -> String {
    (Utc::now() - Duration::days(days_ago))
        .date_naive()
        .to_string()
}

async fn insert(env: &TestEnv, record_type: &str, value: f64, start_date: &str) {
    sqlx::query(
        "INSERT INTO health_data (record_type, unit, record_value, start_date) VALUES (?, NULL, ?, ?)",
    )
    .bind(record_type)
    .bind(value)
    .bind(start_date)
    .execute(&env.pool)
    .await
    .unwrap();
}

#[tokio::test]
async fn test_health_check() {
    let env = TestEnv::new().await;
    let (app, _) = app(&env);

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_import_status_starts_idle() {
    let env = TestEnv::new().await;
    let (app, _) = app(&env);

    let (status, body) = send(&app, get("/api/import-status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "status": "idle", "message": "Awaiting new data upload." })
    );
}

#[tokio::test]
async fn test_ack_status_always_succeeds() {
    let env = TestEnv::new().await;
    let (app, runner) = app(&env);

    let (status, body) = send(&app, post("/api/ack-status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    // Running imports are not cleared by acknowledgment
    assert!(runner.status().try_begin("Extracting zip file..."));
    send(&app, post("/api/ack-status")).await;
    assert_eq!(runner.status().phase(), ImportPhase::Running);
}

#[tokio::test]
async fn test_upload_starts_import() {
    let env = TestEnv::new().await;
    let (app, runner) = app(&env);
    let xml = export_xml(&[steps("42", "2023-01-01 08:00:00 +0000")]);
    let archive = zip_bytes(&[("apple_health_export/export.xml", xml.as_str())]);

    let (status, body) = send(&app, upload("file", "export.zip", &archive)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, json!({ "accepted": true }));

    runner.wait().await;
    let (_, body) = send(&app, get("/api/import-status")).await;
    assert_eq!(body["status"], "complete");
    assert_eq!(env.row_count().await, 1);
    assert!(env.leftovers().is_empty(), "leftovers: {:?}", env.leftovers());

    let (_, body) = send(&app, post("/api/ack-status")).await;
    assert_eq!(body, json!({ "success": true }));
    assert_eq!(runner.status().phase(), ImportPhase::Idle);
}

#[tokio::test]
async fn test_upload_rejects_non_zip() {
    let env = TestEnv::new().await;
    let (app, runner) = app(&env);

    let (status, body) = send(&app, upload("file", "export.xml", b"<HealthData/>")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Only .zip archives are accepted");
    assert_eq!(runner.status().phase(), ImportPhase::Idle);
}

#[tokio::test]
async fn test_upload_requires_file_field() {
    let env = TestEnv::new().await;
    let (app, _) = app(&env);

    let (status, body) = send(&app, upload("attachment", "export.zip", b"PK")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "No file part in the request");
}

#[tokio::test]
async fn test_upload_conflict_while_running() {
    let env = TestEnv::new().await;
    let (app, runner) = app(&env);
    assert!(runner.status().try_begin("Extracting zip file..."));

    let (status, body) = send(&app, upload("file", "export.zip", &zip_bytes(&[]))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["status"], 409);
    assert!(env.leftovers().is_empty());
}

#[tokio::test]
async fn test_data_requires_type() {
    let env = TestEnv::new().await;
    let (app, _) = app(&env);

    let (status, body) = send(&app, get("/api/data?days=7")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Missing 'type' parameter");
}

#[tokio::test]
async fn test_data_rejects_unknown_aggregate() {
    let env = TestEnv::new().await;
    let (app, _) = app(&env);

    let (status, body) = send(
        &app,
        get("/api/data?type=HKQuantityTypeIdentifierStepCount&aggregate=median"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["status"], 400);
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn test_malformed_days_returns_json_error() {
    let env = TestEnv::new().await;
    let (app, _) = app(&env);

    for uri in ["/api/data?type=x&days=x", "/api/sleep?days=x", "/api/summary?days=1.5"] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"]["status"], 400, "{uri}");
    }
}

#[tokio::test]
async fn test_data_raw_and_aggregated() {
    let env = TestEnv::new().await;
    let steps = "HKQuantityTypeIdentifierStepCount";
    insert(&env, steps, 1000.0, &format!("{}T08:00:00+00:00", day(2))).await;
    insert(&env, steps, 500.0, &format!("{}T18:00:00+00:00", day(2))).await;
    insert(&env, steps, 3000.0, &format!("{}T09:00:00+00:00", day(1))).await;
    insert(&env, steps, 9999.0, &format!("{}T09:00:00+00:00", day(400))).await;
    insert(&env, "HKQuantityTypeIdentifierHeartRate", 60.0, &format!("{}T09:00:00+00:00", day(1))).await;
    let (app, _) = app(&env);

    let (status, body) = send(&app, get(&format!("/api/data?type={steps}"))).await;
    assert_eq!(status, StatusCode::OK);
    let values: Vec<f64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["record_value"].as_f64().unwrap())
        .collect();
    assert_eq!(values, vec![1000.0, 500.0, 3000.0]);

    let (_, body) = send(&app, get(&format!("/api/data?type={steps}&aggregate=sum"))).await;
    assert_eq!(
        body,
        json!([
            { "start_date": day(2), "record_value": 1500.0 },
            { "start_date": day(1), "record_value": 3000.0 },
        ])
    );

    let (_, body) = send(&app, get(&format!("/api/data?type={steps}&aggregate=avg&days=30"))).await;
    assert_eq!(body[0]["record_value"], 750.0);
}

#[tokio::test]
async fn test_sleep_stages_by_day() {
    let env = TestEnv::new().await;
    let (d2, d1) = (day(2), day(1));
    insert(&env, "HKCategoryValueSleepAnalysisAsleepDeep", 90.0, &format!("{d2}T01:00:00+00:00")).await;
    insert(&env, "HKCategoryValueSleepAnalysisAsleepDeep", 60.0, &format!("{d2}T03:00:00+00:00")).await;
    insert(&env, "HKCategoryValueSleepAnalysisAwake", 10.0, &format!("{d2}T04:00:00+00:00")).await;
    insert(&env, "HKCategoryValueSleepAnalysisAsleepREM", 30.0, &format!("{d1}T02:00:00+00:00")).await;
    insert(&env, "HKCategoryValueSleepAnalysisInBed", 480.0, &format!("{d1}T00:00:00+00:00")).await;
    let (app, _) = app(&env);

    let (status, body) = send(&app, get("/api/sleep")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["labels"], json!([&d2, &d1]));

    let stages = &body["stages"];
    assert_eq!(stages.as_object().unwrap().len(), 4);
    assert_eq!(stages["HKCategoryValueSleepAnalysisAsleepDeep"][&d2], 150.0);
    assert_eq!(stages["HKCategoryValueSleepAnalysisAwake"][&d2], 10.0);
    assert_eq!(stages["HKCategoryValueSleepAnalysisAsleepREM"][&d1], 30.0);
    assert_eq!(stages["HKCategoryValueSleepAnalysisAsleepCore"], json!({}));
}

#[tokio::test]
async fn test_summary_figures() {
    let env = TestEnv::new().await;
    let (d2, d1) = (day(2), day(1));
    let rows = [
        ("HKQuantityTypeIdentifierRestingHeartRate", 55.0, &d2),
        ("HKQuantityTypeIdentifierRestingHeartRate", 62.0, &d1),
        ("HKQuantityTypeIdentifierStepCount", 1000.0, &d2),
        ("HKQuantityTypeIdentifierStepCount", 500.0, &d2),
        ("HKQuantityTypeIdentifierStepCount", 3000.0, &d1),
        ("HKQuantityTypeIdentifierHeartRateVariabilitySDNN", 40.0, &d2),
        ("HKQuantityTypeIdentifierHeartRateVariabilitySDNN", 75.0, &d1),
        ("HKCategoryValueSleepAnalysisAsleepDeep", 150.0, &d2),
        ("HKCategoryValueSleepAnalysisAsleepCore", 100.0, &d2),
        ("HKCategoryValueSleepAnalysisAwake", 45.0, &d2),
        ("HKCategoryValueSleepAnalysisAsleepREM", 30.0, &d1),
    ];
    for (record_type, value, date) in rows {
        insert(&env, record_type, value, &format!("{date}T06:00:00+00:00")).await;
    }
    let (app, _) = app(&env);

    let (status, body) = send(&app, get("/api/summary")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "lowest_rhr": 55.0,
            "highest_rhr": 62.0,
            "avg_steps": 2250.0,
            "highest_hrv": 75.0,
            "avg_sleep_minutes": 140.0,
        })
    );
}

#[tokio::test]
async fn test_summary_empty_database() {
    let env = TestEnv::new().await;
    let (app, _) = app(&env);

    let (status, body) = send(&app, get("/api/summary?days=7")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "lowest_rhr": null,
            "highest_rhr": null,
            "avg_steps": null,
            "highest_hrv": null,
            "avg_sleep_minutes": null,
        })
    );
}
