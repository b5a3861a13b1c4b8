use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::error_handling::types::BroadcastError;
use crate::log_ingest::types::RequestLogRecord;
use crate::metrics::types::MetricsSnapshot;

/// Message pushed to subscribers, serialized as
/// `{"type": "new_request" | "traffic_update", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Envelope {
    NewRequest(RequestLogRecord),
    TrafficUpdate(MetricsSnapshot),
}

impl Envelope {
    pub fn to_json(&self) -> Result<String, BroadcastError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One connected broadcast target.
///
/// The session only holds the sending half of a bounded FIFO; the transport
/// (a WebSocket writer task in production) drains the other half. Delivery
/// order to one session therefore matches submission order.
#[derive(Debug, Clone)]
pub struct SubscriberSession {
    pub id: Uuid,
    pub connected_at: DateTime<Utc>,
    outbound: mpsc::Sender<String>,
}

impl SubscriberSession {
    /// Creates a session and the receiver its transport should drain.
    pub fn new(queue_capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (outbound, rx) = mpsc::channel(queue_capacity.max(1));
        let session = Self {
            id: Uuid::new_v4(),
            connected_at: Utc::now(),
            outbound,
        };
        (session, rx)
    }

    /// Queues one serialized message without waiting.
    pub fn deliver(&self, payload: &str) -> Result<(), BroadcastError> {
        self.outbound
            .try_send(payload.to_string())
            .map_err(|e| match e {
                TrySendError::Full(_) => BroadcastError::QueueFull,
                TrySendError::Closed(_) => BroadcastError::SessionClosed,
            })
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_wire_format() {
        let record = RequestLogRecord {
            timestamp: "2024-05-01T10:00:00Z".to_string(),
            method: "GET".to_string(),
            path: "/api/etf/list".to_string(),
            status_code: 200,
            duration_ms: 0.0,
        };
        let json: serde_json::Value =
            serde_json::from_str(&Envelope::NewRequest(record).to_json().unwrap()).unwrap();

        assert_eq!(json["type"], "new_request");
        assert_eq!(json["data"]["method"], "GET");
        assert_eq!(json["data"]["path"], "/api/etf/list");
        assert_eq!(json["data"]["status_code"], 200);

        let json: serde_json::Value = serde_json::from_str(
            &Envelope::TrafficUpdate(MetricsSnapshot::empty())
                .to_json()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(json["type"], "traffic_update");
        assert_eq!(json["data"]["request_count"], 0);
        assert_eq!(json["data"]["success_rate"], 100.0);
    }

    #[tokio::test]
    async fn deliver_reports_full_and_closed_queues() {
        let (session, mut rx) = SubscriberSession::new(1);
        session.deliver("one").unwrap();
        assert!(matches!(session.deliver("two"), Err(BroadcastError::QueueFull)));
        assert_eq!(rx.recv().await.unwrap(), "one");

        drop(rx);
        assert!(session.is_closed());
        assert!(matches!(
            session.deliver("three"),
            Err(BroadcastError::SessionClosed)
        ));
    }
}
