use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Summary of the current aggregation window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// ISO-8601 instant of computation
    pub timestamp: String,
    pub request_count: usize,
    /// Mean latency over the window, `0` when empty
    pub avg_duration_ms: f64,
    /// Records with a status code of 400 or above
    pub error_count: usize,
    /// Percentage of non-error records, `100` when empty
    pub success_rate: f64,
}

impl MetricsSnapshot {
    /// The snapshot of an idle window.
    pub fn empty() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            request_count: 0,
            avg_duration_ms: 0.0,
            error_count: 0,
            success_rate: 100.0,
        }
    }
}
