//! Periodic `traffic_update` ticks for one subscriber.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use super::aggregator::MetricsAggregator;
use crate::error_handling::types::BroadcastError;
use crate::session_management::{ConnectionRegistry, Envelope};

/// Ticks once per interval for the session that owns it: snapshot the shared
/// window, push a `traffic_update`, then roll the window if it has expired.
///
/// Every subscriber gets its own scheduler; they all read the same
/// aggregator, and the window's own clock check keeps resets at one per
/// interval however many schedulers are running.
pub struct AggregationScheduler {
    session_id: Uuid,
    aggregator: Arc<MetricsAggregator>,
    registry: Arc<ConnectionRegistry>,
    interval: Duration,
}

impl AggregationScheduler {
    pub fn new(
        session_id: Uuid,
        aggregator: Arc<MetricsAggregator>,
        registry: Arc<ConnectionRegistry>,
        interval: Duration,
    ) -> Self {
        Self {
            session_id,
            aggregator,
            registry,
            interval,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until aborted or until the session leaves the registry.
    pub async fn run(self) {
        info!("[{}] aggregation scheduler started", self.session_id);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.tick() {
                Ok(()) => {}
                Err(BroadcastError::UnknownSession) | Err(BroadcastError::SessionClosed) => {
                    debug!("[{}] session gone, scheduler exiting", self.session_id);
                    break;
                }
                Err(e) => error!("[{}] metrics tick failed: {}", self.session_id, e),
            }
        }
    }

    /// One tick. A full outbound queue only skips this update.
    pub fn tick(&self) -> Result<(), BroadcastError> {
        let snapshot = self.aggregator.snapshot();
        let sent = self
            .registry
            .send_to(self.session_id, &Envelope::TrafficUpdate(snapshot));
        self.aggregator.maybe_reset();

        match sent {
            Err(BroadcastError::QueueFull) => {
                debug!("[{}] traffic_update skipped, queue full", self.session_id);
                Ok(())
            }
            other => other,
        }
    }
}
