//! Data types shared by the log ingestion subsystem.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One observed (or synthesized) HTTP request.
///
/// Records are immutable once built: the aggregator keeps a copy in its
/// window and the registry serializes another copy into a `new_request`
/// envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLogRecord {
    /// ISO-8601 instant the record was produced (informational only)
    pub timestamp: String,
    /// HTTP verb, e.g. `GET`
    pub method: String,
    /// Request path
    pub path: String,
    /// HTTP status code
    pub status_code: u16,
    /// Latency in milliseconds, `0` when the source does not report it
    #[serde(alias = "duration")]
    pub duration_ms: f64,
}

impl RequestLogRecord {
    /// Builds a record stamped with the current UTC time.
    pub fn now(
        method: impl Into<String>,
        path: impl Into<String>,
        status_code: u16,
        duration_ms: f64,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            method: method.into(),
            path: path.into(),
            status_code,
            duration_ms: duration_ms.max(0.0),
        }
    }

    /// `true` for 4xx and 5xx responses.
    pub fn is_error(&self) -> bool {
        self.status_code >= 400
    }
}
