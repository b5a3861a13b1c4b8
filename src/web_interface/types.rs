use serde::{Deserialize, Serialize};

use crate::metrics::MetricsSnapshot;

/// API error payload
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<MetricsSnapshot>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub minutes: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleQuery {
    pub enabled: bool,
}
