use std::convert::Infallible;
use std::sync::Arc;

use log::error;
use warp::{http::StatusCode, reply, Filter, Rejection, Reply};

use super::types::*;
use super::websocket;
use crate::controller::{AppContext, ControlSurface};

/// Mount point of every Live Metrics route.
pub const LIVE_METRICS_PREFIX: &str = "/api/v1/live-metrics";

fn with_context(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = (Arc<AppContext>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&ctx))
}

fn with_surface(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = (ControlSurface,), Error = Infallible> + Clone {
    warp::any().map(move || ControlSurface::new(Arc::clone(&ctx)))
}

/// GET /
pub fn root_route() -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path::end().and(warp::get()).map(|| {
        reply::json(&RootResponse {
            status: "ok".to_string(),
            message: "Live Metrics service is running".to_string(),
        })
    })
}

/// GET /health
pub fn health_route() -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("health").and(warp::get()).map(|| {
        reply::json(&HealthResponse {
            status: "healthy".to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    })
}

/// Everything under [`LIVE_METRICS_PREFIX`]: the traffic WebSocket and the
/// polling endpoints of the control surface.
pub fn live_metrics_routes(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("api" / "v1" / "live-metrics" / ..).and(
        traffic_route(Arc::clone(&ctx))
            .or(current_route(Arc::clone(&ctx)))
            .or(history_route(Arc::clone(&ctx)))
            .or(toggle_route(Arc::clone(&ctx)))
            .or(status_route(ctx)),
    )
}

/// GET /ws/traffic (upgrade)
pub fn traffic_route(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("ws" / "traffic")
        .and(warp::ws())
        .and(with_context(ctx))
        .map(|ws: warp::ws::Ws, ctx: Arc<AppContext>| {
            ws.on_upgrade(move |socket| websocket::serve_subscriber(socket, ctx))
        })
}

/// GET /current
pub fn current_route(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("current")
        .and(warp::get())
        .and(with_surface(ctx))
        .map(|surface: ControlSurface| reply::json(&surface.current_metrics()))
}

/// GET /history?minutes=N
pub fn history_route(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("history")
        .and(warp::get())
        .and(warp::query::<HistoryQuery>())
        .and(with_surface(ctx))
        .map(|query: HistoryQuery, surface: ControlSurface| {
            reply::json(&HistoryResponse {
                history: surface.history(query.minutes),
            })
        })
}

/// POST /toggle-dummy-logs?enabled=bool
pub fn toggle_route(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("toggle-dummy-logs")
        .and(warp::post())
        .and(warp::query::<ToggleQuery>())
        .and(with_surface(ctx))
        .map(|query: ToggleQuery, surface: ControlSurface| {
            reply::json(&surface.toggle(query.enabled))
        })
}

/// GET /dummy-logs-status
pub fn status_route(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("dummy-logs-status")
        .and(warp::get())
        .and(with_surface(ctx))
        .map(|surface: ControlSurface| reply::json(&surface.status()))
}

/// Turns every rejection into a JSON [`ApiError`] with a matching status.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::MissingHeader>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidHeader>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed".to_string(),
        )
    } else {
        error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    Ok(reply::with_status(
        reply::json(&ApiError { message }),
        status,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::Config;
    use crate::controller::SourceStatus;
    use crate::metrics::MetricsSnapshot;

    fn context() -> Arc<AppContext> {
        AppContext::new(Config::default())
    }

    #[tokio::test]
    async fn test_health_route() {
        let res = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&health_route())
            .await;

        assert_eq!(res.status(), StatusCode::OK);
        let body: HealthResponse = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body.status, "healthy");
        assert_eq!(body.service, "live-metrics");
    }

    #[tokio::test]
    async fn test_current_route_on_empty_window() {
        let res = warp::test::request()
            .method("GET")
            .path("/api/v1/live-metrics/current")
            .reply(&live_metrics_routes(context()))
            .await;

        assert_eq!(res.status(), StatusCode::OK);
        let snapshot: MetricsSnapshot = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(snapshot.request_count, 0);
        assert_eq!(snapshot.success_rate, 100.0);
    }

    #[tokio::test]
    async fn test_history_route_default_and_cap() {
        let routes = live_metrics_routes(context());

        let res = warp::test::request()
            .path("/api/v1/live-metrics/history")
            .reply(&routes)
            .await;
        let body: HistoryResponse = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body.history.len(), 20);

        let res = warp::test::request()
            .path("/api/v1/live-metrics/history?minutes=90")
            .reply(&routes)
            .await;
        let body: HistoryResponse = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body.history.len(), 60);

        let res = warp::test::request()
            .path("/api/v1/live-metrics/history?minutes=-5")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: HistoryResponse = serde_json::from_slice(res.body()).unwrap();
        assert!(body.history.is_empty());
    }

    #[tokio::test]
    async fn test_status_route() {
        let res = warp::test::request()
            .path("/api/v1/live-metrics/dummy-logs-status")
            .reply(&live_metrics_routes(context()))
            .await;

        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["use_dummy_logs"], true);
        assert_eq!(body["environment"], "development");
        assert_eq!(body["is_production"], false);
    }

    #[tokio::test]
    async fn test_toggle_requires_post_and_enabled() {
        let ctx = context();
        let routes = live_metrics_routes(Arc::clone(&ctx)).recover(handle_rejection);

        let res = warp::test::request()
            .method("GET")
            .path("/api/v1/live-metrics/toggle-dummy-logs?enabled=true")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);

        let res = warp::test::request()
            .method("POST")
            .path("/api/v1/live-metrics/toggle-dummy-logs")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: ApiError = serde_json::from_slice(res.body()).unwrap();
        assert!(!body.message.is_empty());

        let res = warp::test::request()
            .method("POST")
            .path("/api/v1/live-metrics/toggle-dummy-logs?enabled=false")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            ControlSurface::new(ctx).status(),
            SourceStatus {
                use_dummy_logs: false,
                environment: "development".to_string(),
                is_production: false,
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_path_is_json_not_found() {
        let routes = root_route().recover(handle_rejection);
        let res = warp::test::request()
            .path("/does-not-exist")
            .reply(&routes)
            .await;

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body: ApiError = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body.message, "Not found");
    }
}
