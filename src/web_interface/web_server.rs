use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use log::info;
use warp::{Filter, Rejection, Reply};

use super::dashboard::dashboard_route;
use super::request_log::with_request_log;
use super::routes;
use crate::controller::AppContext;
use crate::error_handling::types::WebError;

/// Web server for the HTTP API, the traffic WebSocket and the dashboard
pub struct WebServer {
    ctx: Arc<AppContext>,
}

impl WebServer {
    /// Create a new WebServer instance
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// The full filter tree, CORS and request recording included.
    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        let api = routes::root_route()
            .or(routes::health_route())
            .or(dashboard_route())
            .or(routes::live_metrics_routes(Arc::clone(&self.ctx)))
            .recover(routes::handle_rejection)
            .map(|reply| Reply::into_response(reply));

        with_request_log(Arc::clone(&self.ctx), api).with(self.cors())
    }

    fn cors(&self) -> warp::cors::Builder {
        let cors = warp::cors()
            .allow_methods(vec!["GET", "POST", "OPTIONS"])
            .allow_headers(vec!["content-type", "authorization"])
            .allow_credentials(true);

        let origins = &self.ctx.config.cors_origins;
        if origins.iter().any(|origin| origin == "*") {
            cors.allow_any_origin()
        } else {
            cors.allow_origins(origins.iter().map(String::as_str))
        }
    }

    /// Address the server binds to, from the configured host and port.
    pub fn address(&self) -> Result<SocketAddr, WebError> {
        let host = self.ctx.config.api_host.trim();
        let port = self.ctx.config.api_port;
        let ip: IpAddr = match host {
            "localhost" => Ipv4Addr::LOCALHOST.into(),
            other => other
                .parse()
                .map_err(|_| WebError::InvalidAddress(format!("{}:{}", host, port)))?,
        };
        Ok(SocketAddr::new(ip, port))
    }

    /// Start the web server; returns only if it cannot bind.
    pub async fn start(&self) -> Result<(), WebError> {
        let addr = self.address()?;

        // warp panics on a failed bind, probe the port first
        let probe = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| WebError::ServerFailed(format!("unable to bind {}: {}", addr, e)))?;
        drop(probe);

        info!("[+] Live Metrics listening on http://{}", addr);
        info!(
            "[+] Traffic stream on ws://{}{}/ws/traffic",
            addr,
            routes::LIVE_METRICS_PREFIX
        );
        warp::serve(self.routes()).run(addr).await;

        Ok(())
    }
}
