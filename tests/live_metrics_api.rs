use std::sync::Arc;

use live_metrics::configuration::Config;
use live_metrics::controller::AppContext;
use live_metrics::metrics::MetricsSnapshot;
use live_metrics::web_interface::types::{HealthResponse, HistoryResponse, RootResponse};
use live_metrics::web_interface::WebServer;
use warp::http::StatusCode;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn context(environment: &str) -> Arc<AppContext> {
    init_logging();
    AppContext::new(Config {
        environment: environment.to_string(),
        tail_program: "/nonexistent/live-metrics-tail".to_string(),
        synthetic_interval_ms: 60_000,
        ..Config::default()
    })
}

async fn current(server: &WebServer) -> MetricsSnapshot {
    let res = warp::test::request()
        .path("/api/v1/live-metrics/current")
        .reply(&server.routes())
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    serde_json::from_slice(res.body()).unwrap()
}

#[tokio::test]
async fn root_and_health_endpoints() {
    let server = WebServer::new(context("development"));

    let res = warp::test::request().path("/").reply(&server.routes()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let root: RootResponse = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(root.status, "ok");

    let res = warp::test::request()
        .path("/health")
        .reply(&server.routes())
        .await;
    let health: HealthResponse = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn served_requests_feed_the_window_but_metrics_polls_do_not() {
    let server = WebServer::new(context("production"));

    assert_eq!(current(&server).await.request_count, 0);

    for path in ["/", "/health", "/missing"] {
        warp::test::request().path(path).reply(&server.routes()).await;
    }

    let snapshot = current(&server).await;
    assert_eq!(snapshot.request_count, 3);
    assert_eq!(snapshot.error_count, 1);
    assert!((snapshot.success_rate - 200.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn history_endpoint_respects_default_and_cap() {
    let server = WebServer::new(context("development"));

    let res = warp::test::request()
        .path("/api/v1/live-metrics/history?minutes=5")
        .reply(&server.routes())
        .await;
    let body: HistoryResponse = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body.history.len(), 5);
    assert!(body
        .history
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp));

    let res = warp::test::request()
        .path("/api/v1/live-metrics/history?minutes=1000")
        .reply(&server.routes())
        .await;
    let body: HistoryResponse = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body.history.len(), 60);
}

#[tokio::test]
async fn toggle_and_status_round_trip() {
    let ctx = context("production");
    let server = WebServer::new(Arc::clone(&ctx));

    let res = warp::test::request()
        .path("/api/v1/live-metrics/dummy-logs-status")
        .reply(&server.routes())
        .await;
    let status: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(status["use_dummy_logs"], false);
    assert_eq!(status["is_production"], true);
    assert!(!ctx.supervisor.is_running());

    let res = warp::test::request()
        .method("POST")
        .path("/api/v1/live-metrics/toggle-dummy-logs?enabled=true")
        .reply(&server.routes())
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let toggled: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(toggled["success"], true);
    assert_eq!(toggled["use_dummy_logs"], true);
    assert_eq!(toggled["environment"], "production");
    assert!(ctx.supervisor.is_running());

    let res = warp::test::request()
        .method("POST")
        .path("/api/v1/live-metrics/toggle-dummy-logs?enabled=false")
        .reply(&server.routes())
        .await;
    let toggled: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(toggled["use_dummy_logs"], false);
    assert!(!ctx.supervisor.is_running());

    let res = warp::test::request()
        .path("/api/v1/live-metrics/dummy-logs-status")
        .reply(&server.routes())
        .await;
    let status: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(status["use_dummy_logs"], false);
}

#[tokio::test]
async fn toggle_without_enabled_is_a_json_bad_request() {
    let server = WebServer::new(context("development"));
    let res = warp::test::request()
        .method("POST")
        .path("/api/v1/live-metrics/toggle-dummy-logs?enabled=maybe")
        .reply(&server.routes())
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert!(body["message"].is_string());
}
