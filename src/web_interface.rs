// Web Interface module root
pub mod dashboard;
pub mod request_log;
pub mod routes;
pub mod types;
pub mod web_server;
pub mod websocket;

// Re-export commonly used items
pub use routes::LIVE_METRICS_PREFIX;
pub use types::ApiError;
pub use web_server::WebServer;
