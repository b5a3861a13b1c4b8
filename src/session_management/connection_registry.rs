use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use uuid::Uuid;

use super::subscriber::{Envelope, SubscriberSession};
use crate::error_handling::types::BroadcastError;
use crate::log_ingest::types::RequestLogRecord;
use crate::metrics::aggregator::MetricsAggregator;

/// The set of active subscribers and the fan-out over them.
///
/// This structure tracks every connected [`SubscriberSession`] and delivers
/// envelopes to them. Delivery is best effort:
/// - every session is attempted independently, one failure never stops the
///   others;
/// - a session whose transport is gone is removed during the same call
///   (lazy cleanup, no heartbeat);
/// - a session whose queue is full just misses that message.
///
/// # Fields Overview
///
/// - `sessions`: active subscribers keyed by id
/// - `aggregator`: window that [`ConnectionRegistry::add_event`] appends to
pub struct ConnectionRegistry {
    sessions: Mutex<HashMap<Uuid, SubscriberSession>>,
    aggregator: Arc<MetricsAggregator>,
}

impl ConnectionRegistry {
    pub fn new(aggregator: Arc<MetricsAggregator>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            aggregator,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, SubscriberSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn aggregator(&self) -> &Arc<MetricsAggregator> {
        &self.aggregator
    }

    /// Registers a subscriber whose transport handshake has completed.
    pub fn connect(&self, session: SubscriberSession) {
        let mut sessions = self.lock();
        sessions.insert(session.id, session);
        info!("Subscriber connected. Active subscribers: {}", sessions.len());
    }

    /// Removes a subscriber. Removing an unknown id is a no-op and returns
    /// `false`.
    pub fn disconnect(&self, session_id: Uuid) -> bool {
        let mut sessions = self.lock();
        let removed = sessions.remove(&session_id).is_some();
        if removed {
            info!(
                "Subscriber disconnected. Active subscribers: {}",
                sessions.len()
            );
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, session_id: Uuid) -> bool {
        self.lock().contains_key(&session_id)
    }

    /// Sends `envelope` to every registered session and returns how many
    /// accepted it. Only a serialization failure is reported as an error.
    pub fn broadcast(&self, envelope: &Envelope) -> Result<usize, BroadcastError> {
        let payload = envelope.to_json()?;
        let mut sessions = self.lock();

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, session) in sessions.iter() {
            match session.deliver(&payload) {
                Ok(()) => delivered += 1,
                Err(BroadcastError::QueueFull) => {
                    warn!("[{}] outbound queue full, message dropped", id);
                }
                Err(e) => {
                    warn!("[{}] message delivery failed: {}", id, e);
                    closed.push(*id);
                }
            }
        }

        for id in closed {
            sessions.remove(&id);
        }
        if sessions.len() != delivered {
            debug!(
                "Broadcast delivered to {}/{} subscribers",
                delivered,
                sessions.len()
            );
        }
        Ok(delivered)
    }

    /// Sends `envelope` to one session, removing it if its transport is gone.
    pub fn send_to(&self, session_id: Uuid, envelope: &Envelope) -> Result<(), BroadcastError> {
        let payload = envelope.to_json()?;
        let mut sessions = self.lock();
        let session = sessions
            .get(&session_id)
            .ok_or(BroadcastError::UnknownSession)?;

        let result = session.deliver(&payload);
        if let Err(BroadcastError::SessionClosed) = result {
            sessions.remove(&session_id);
            warn!("[{}] session closed, removed from registry", session_id);
        }
        result
    }

    /// Appends `record` to the window and pushes it to subscribers as a
    /// `new_request` event. Nothing is buffered when nobody is listening.
    pub fn add_event(&self, record: RequestLogRecord) -> usize {
        // roll an expired window even when no scheduler is ticking
        self.aggregator.maybe_reset();
        self.aggregator.record(record.clone());

        if self.is_empty() {
            debug!("No active subscribers, new_request broadcast skipped");
            return 0;
        }

        debug!(
            "Broadcasting new_request: {} {} {}",
            record.method, record.path, record.status_code
        );
        match self.broadcast(&Envelope::NewRequest(record)) {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!("new_request broadcast failed: {}", e);
                0
            }
        }
    }
}
