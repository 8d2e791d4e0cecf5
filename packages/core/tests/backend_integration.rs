//! Integration tests for the backend client stack.
//!
//! Each test starts a wiremock server standing in for the analytics backend
//! and drives the real `ApiClient`, domain APIs, orchestrator and stores
//! against it.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::{json, Value};
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use logistics_dashboard::{
    api::BackendApis,
    config::Config,
    error::AppError,
    notify::{NotifyLevel, RecordingNotifier},
    services::backend::{ApiClient, QueryParams},
    session::DashboardSession,
    storage::{keys, LocalStorage},
};

// ---- Helpers ----------------------------------------------------------------

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
}

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::from_lookup(|_| None).unwrap();
    config.api_base_url = server.uri();
    config
}

fn apis_for(server: &MockServer, storage: Arc<LocalStorage>) -> BackendApis {
    let client = ApiClient::new(&server.uri(), Duration::from_secs(5), storage).unwrap();
    BackendApis::new(Arc::new(client))
}

fn session_for(server: &MockServer) -> (DashboardSession, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let session = DashboardSession::with_storage(
        &config_for(server),
        Arc::new(LocalStorage::in_memory()),
        notifier.clone(),
    )
    .unwrap();
    (session, notifier)
}

fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}

// ---- KPI ----------------------------------------------------------------------

#[tokio::test]
async fn today_kpi_unwraps_the_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/kpi/today/shanghai"))
        .respond_with(ok(json!({ "totalOrders": 120 })))
        .mount(&server)
        .await;

    let (session, _notifier) = session_for(&server);
    let kpi = tokio_test::assert_ok!(session.today_kpi("shanghai").await);

    assert_eq!(kpi.total_orders, Some(120));
    assert!(session.orchestrator().state().success);
}

#[tokio::test]
async fn rejected_request_surfaces_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/kpi/today/atlantis"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": false, "message": "city not found" })),
        )
        .mount(&server)
        .await;

    let (session, notifier) = session_for(&server);
    let err = session.today_kpi("atlantis").await.unwrap_err();

    assert_eq!(err.to_string(), "city not found");
    assert_eq!(notifier.messages_at(NotifyLevel::Error), vec!["city not found"]);
    assert_eq!(session.orchestrator().state().last_error.as_deref(), Some("city not found"));
}

#[tokio::test]
async fn non_2xx_without_body_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/kpi/count/shanghai"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let apis = apis_for(&server, Arc::new(LocalStorage::in_memory()));
    let err = tokio_test::assert_err!(apis.kpi.get_kpi_count("shanghai").await);

    assert!(matches!(err, AppError::Api { status: Some(503), ref message } if message == "HTTP 503"));
}

#[tokio::test]
async fn kpi_trend_maps_records_to_points() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/kpi/recent/shanghai"))
        .and(query_param("days", "7"))
        .respond_with(ok(json!([
            { "date": "2024-03-01", "totalOrders": 10, "activeCouriers": 2, "avgDeliveryTime": 31.5 },
            { "date": "2024-03-02", "totalOrders": 12, "activeCouriers": 3 }
        ])))
        .mount(&server)
        .await;

    let (session, _notifier) = session_for(&server);
    let trend = session.kpi_trend("shanghai", None).await.unwrap();

    assert_eq!(trend.len(), 2);
    assert_eq!(trend[0].orders, Some(10));
    assert_eq!(trend[0].avg_delivery_time, Some(31.5));
    assert_eq!(trend[1].couriers, Some(3));
    assert_eq!(trend[1].date, Some(date("2024-03-02")));
}

// ---- Auth ---------------------------------------------------------------------

#[tokio::test]
async fn stored_token_is_sent_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/spark/jobs"))
        .and(header("Authorization", "Bearer secret-token"))
        .respond_with(ok(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(LocalStorage::in_memory());
    storage.set(keys::TOKEN, "secret-token").unwrap();

    let apis = apis_for(&server, storage);
    let jobs = apis.spark.get_all_jobs().await.unwrap();

    assert!(jobs.is_empty());
}

// ---- Alerts -------------------------------------------------------------------

#[tokio::test]
async fn recent_alerts_use_default_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/alerts/recent"))
        .and(query_param("limit", "50"))
        .respond_with(ok(json!([
            { "id": 1, "city": "shanghai", "anomalyType": "DELAY", "anomalySeverity": "HIGH" }
        ])))
        .mount(&server)
        .await;

    let (session, _notifier) = session_for(&server);
    let alerts = session.recent_alerts(None).await.unwrap();

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].id, 1);
}

#[tokio::test]
async fn store_rolls_back_when_backend_refuses_resolution() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/alerts/today/shanghai"))
        .respond_with(ok(json!([
            { "id": 7, "city": "shanghai", "anomalyType": "DELAY", "anomalySeverity": "LOW" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/alerts/resolve/7"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": false, "message": "alert is locked" })),
        )
        .mount(&server)
        .await;

    let (session, notifier) = session_for(&server);
    let store = session.alerts();
    store
        .fetch_alerts(logistics_dashboard::stores::alerts::FetchOptions {
            city: Some("shanghai".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    let err = store.resolve_alert(7).await.unwrap_err();

    assert_eq!(err.to_string(), "alert is locked");
    let state = store.read().await;
    assert!(!state.alerts[0].is_resolved);
    assert!(state.alerts[0].resolved_at.is_none());
    assert_eq!(notifier.messages_at(NotifyLevel::Error), vec!["Failed to resolve alert"]);
}

// ---- Predictive ---------------------------------------------------------------

#[tokio::test]
async fn predictive_routes_use_canonical_city_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/predictive-analysis/trends/Shanghai"))
        .respond_with(ok(json!({ "forecast": [1, 2, 3] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/predictive-analysis/search"))
        .and(query_param("city", "Beijing"))
        .respond_with(ok(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let apis = apis_for(&server, Arc::new(LocalStorage::in_memory()));

    let forecast = apis.predictive.get_demand_forecast("shanghai").await.unwrap();
    assert_eq!(forecast["forecast"][2], 3);

    apis.predictive
        .search(QueryParams::new().push("city", "beijing"))
        .await
        .unwrap();
}

// ---- Reports ------------------------------------------------------------------

#[tokio::test]
async fn report_download_returns_raw_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reports/r-42/download"))
        .and(query_param("format", "pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
        .mount(&server)
        .await;

    let apis = apis_for(&server, Arc::new(LocalStorage::in_memory()));
    let bytes = apis.reports.download("r-42", None).await.unwrap();

    assert_eq!(bytes, b"%PDF-1.7");
}

// ---- Cost composites ----------------------------------------------------------

#[tokio::test]
async fn cost_overview_gathers_all_sections() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cost-analysis/city/shanghai"))
        .respond_with(ok(json!({ "total": 1500 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cost-analysis/trend/city/shanghai"))
        .respond_with(ok(json!([1, 2])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cost-analysis/summary/shanghai"))
        .respond_with(ok(json!({ "avg": 12.5 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cost-analysis/ranking/region"))
        .respond_with(ok(json!(["pudong"])))
        .mount(&server)
        .await;

    let apis = apis_for(&server, Arc::new(LocalStorage::in_memory()));
    let overview = apis
        .cost
        .get_overview("shanghai", date("2024-03-01"), date("2024-03-07"))
        .await
        .unwrap();

    assert_eq!(overview.analysis["total"], 1500);
    assert_eq!(overview.trend, json!([1, 2]));
    assert_eq!(overview.summary["avg"], 12.5);
    assert_eq!(overview.ranking[0], "pudong");
}

#[tokio::test]
async fn cost_overview_fails_when_one_section_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cost-analysis/summary/shanghai"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "success": false, "message": "summary unavailable" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ok(json!({})))
        .mount(&server)
        .await;

    let apis = apis_for(&server, Arc::new(LocalStorage::in_memory()));
    let err = apis
        .cost
        .get_overview("shanghai", date("2024-03-01"), date("2024-03-07"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "summary unavailable");
}
