use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use log::trace;
use warp::filters::path::FullPath;
use warp::http::Method;
use warp::reply::Response;
use warp::Filter;

use super::routes::LIVE_METRICS_PREFIX;
use crate::controller::AppContext;
use crate::log_ingest::RequestLogRecord;

/// Wraps `inner` so every request it answers is fed into the live window and
/// broadcast as a `new_request` event. `inner` must already have recovered
/// its rejections, so not-found and bad requests are recorded too.
///
/// Requests under [`LIVE_METRICS_PREFIX`] are never recorded, otherwise a
/// dashboard polling `/current` would show up in its own numbers.
pub fn with_request_log<F>(
    ctx: Arc<AppContext>,
    inner: F,
) -> impl Filter<Extract = (Response,), Error = Infallible> + Clone
where
    F: Filter<Extract = (Response,), Error = Infallible> + Clone + Send + Sync + 'static,
{
    warp::any()
        .map(Instant::now)
        .and(warp::method())
        .and(warp::path::full())
        .and(inner)
        .map(
            move |started: Instant, method: Method, path: FullPath, response: Response| {
                if ctx.config.record_http_traffic && is_recorded(path.as_str()) {
                    let elapsed = started.elapsed().as_secs_f64() * 1000.0;
                    trace!("{} {} {} {:.2}ms", method, path.as_str(), response.status(), elapsed);
                    ctx.registry.add_event(RequestLogRecord::now(
                        method.as_str(),
                        path.as_str(),
                        response.status().as_u16(),
                        elapsed,
                    ));
                }
                response
            },
        )
}

pub fn is_recorded(path: &str) -> bool {
    !path.starts_with(LIVE_METRICS_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::Config;
    use crate::web_interface::routes::handle_rejection;
    use warp::http::StatusCode;
    use warp::Reply;

    fn inner() -> impl Filter<Extract = (Response,), Error = Infallible> + Clone {
        let teapot = warp::path!("teapot")
            .map(|| warp::reply::with_status("short and stout", StatusCode::IM_A_TEAPOT))
            .map(|reply| Reply::into_response(reply));
        let metrics = warp::path!("api" / "v1" / "live-metrics" / "current")
            .map(|| warp::reply().into_response());
        teapot
            .or(metrics)
            .unify()
            .recover(handle_rejection)
            .map(|reply| Reply::into_response(reply))
    }

    #[test]
    fn test_live_metrics_prefix_is_not_recorded() {
        assert!(is_recorded("/"));
        assert!(is_recorded("/api/etf/list"));
        assert!(!is_recorded("/api/v1/live-metrics/current"));
        assert!(!is_recorded("/api/v1/live-metrics/ws/traffic"));
    }

    #[tokio::test]
    async fn test_served_request_is_recorded_with_status() {
        let ctx = AppContext::new(Config::default());
        let filter = with_request_log(Arc::clone(&ctx), inner());

        let res = warp::test::request()
            .method("PUT")
            .path("/teapot")
            .reply(&filter)
            .await;
        assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);

        let snapshot = ctx.aggregator.snapshot();
        assert_eq!(snapshot.request_count, 1);
        assert_eq!(snapshot.error_count, 1);
    }

    #[tokio::test]
    async fn test_not_found_is_recorded() {
        let ctx = AppContext::new(Config::default());
        let filter = with_request_log(Arc::clone(&ctx), inner());

        let res = warp::test::request().path("/nowhere").reply(&filter).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(ctx.aggregator.snapshot().error_count, 1);
    }

    #[tokio::test]
    async fn test_prefix_and_disabled_recording() {
        let ctx = AppContext::new(Config::default());
        let filter = with_request_log(Arc::clone(&ctx), inner());
        warp::test::request()
            .path("/api/v1/live-metrics/current")
            .reply(&filter)
            .await;
        assert!(ctx.aggregator.is_empty());

        let ctx = AppContext::new(Config {
            record_http_traffic: false,
            ..Config::default()
        });
        let filter = with_request_log(Arc::clone(&ctx), inner());
        warp::test::request().path("/teapot").reply(&filter).await;
        assert!(ctx.aggregator.is_empty());
    }
}
