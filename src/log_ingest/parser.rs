//! Log line parser.
//!
//! Two line shapes are recognised:
//!
//! ```text
//! INFO:     127.0.0.1:54321 - "GET /api/etf/list HTTP/1.1" 200 OK
//! 2024-05-01T10:00:00Z {"timestamp": "...", "duration": 123, "resultCode": 200, "url": "/x"}
//! ```
//!
//! The first is a uvicorn style access log line and carries no latency, so the
//! record gets `duration_ms = 0`. The second is a request telemetry object
//! embedded anywhere in the line; it must carry `resultCode` or `status`.
//!
//! Anything else yields `None`. Parsing never fails loudly: a malformed line is
//! simply not a request.

use std::sync::OnceLock;

use chrono::Utc;
use log::trace;
use regex::Regex;
use serde_json::{Map, Value};

use super::types::RequestLogRecord;

const ACCESS_LOG_PATTERN: &str = r#"(?P<level>\w+):\s+(?P<client>[\d\.:]+)\s+-\s+"(?P<method>\w+)\s+(?P<path>[^\s]+)\s+HTTP/[\d\.]+"\s+(?P<status>\d+)"#;
const JSON_OBJECT_PATTERN: &str = r"\{.*\}";

fn access_log_regex() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(ACCESS_LOG_PATTERN).ok())
        .as_ref()
}

fn json_object_regex() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(JSON_OBJECT_PATTERN).ok())
        .as_ref()
}

/// Converts one raw log line into a [`RequestLogRecord`], or `None` when the
/// line matches neither recognised shape.
pub fn parse_log_line(line: &str) -> Option<RequestLogRecord> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let parsed = parse_access_log(line).or_else(|| parse_json_telemetry(line));
    if parsed.is_none() {
        trace!("unparsed log line: {}", line);
    }
    parsed
}

fn parse_access_log(line: &str) -> Option<RequestLogRecord> {
    let caps = access_log_regex()?.captures(line)?;
    let status_code = caps.name("status")?.as_str().parse::<u16>().ok()?;

    Some(RequestLogRecord {
        timestamp: Utc::now().to_rfc3339(),
        method: caps.name("method")?.as_str().to_string(),
        path: caps.name("path")?.as_str().to_string(),
        status_code,
        duration_ms: 0.0,
    })
}

fn parse_json_telemetry(line: &str) -> Option<RequestLogRecord> {
    if !line.contains('{') || !line.contains('}') {
        return None;
    }
    let object = json_object_regex()?.find(line)?;
    let value: Value = serde_json::from_str(object.as_str()).ok()?;
    let data = value.as_object()?;

    let status = data.get("resultCode").or_else(|| data.get("status"))?;
    let status_code = u16::try_from(as_number(status)? as i64).ok()?;

    let duration_ms = match data.get("duration") {
        Some(d) => as_number(d)?,
        None => 0.0,
    };

    Some(RequestLogRecord {
        timestamp: string_field(data, "timestamp").unwrap_or_else(|| Utc::now().to_rfc3339()),
        method: string_field(data, "method").unwrap_or_else(|| "GET".to_string()),
        path: string_field(data, "url").unwrap_or_else(|| "/".to_string()),
        status_code,
        duration_ms: duration_ms.max(0.0),
    })
}

/// Telemetry exporters disagree on whether numbers are quoted.
fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn string_field(data: &Map<String, Value>, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_string)
}
