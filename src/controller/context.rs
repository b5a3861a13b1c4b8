//! Application-scoped state shared by every handler.

use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::configuration::{Config, Environment};
use crate::log_ingest::{RequestLogRecord, SourceModeFlag, SourceSettings, SourceSupervisor};
use crate::metrics::{AggregationScheduler, MetricsAggregator};
use crate::session_management::{ConnectionRegistry, SubscriberSession};

/// Everything the Live Metrics service shares across tasks.
///
/// One context is built per server instance and handed to the web layer at
/// construction time; nothing here is a process global, so tests can run as
/// many independent instances as they like.
pub struct AppContext {
    pub config: Config,
    pub environment: Environment,
    pub aggregator: Arc<MetricsAggregator>,
    pub registry: Arc<ConnectionRegistry>,
    pub mode: Arc<SourceModeFlag>,
    pub supervisor: SourceSupervisor,
    ingest_rx: Mutex<Option<mpsc::Receiver<RequestLogRecord>>>,
}

impl AppContext {
    pub fn new(config: Config) -> Arc<Self> {
        let environment = config.environment();
        let aggregator = Arc::new(MetricsAggregator::new(config.window()));
        let registry = Arc::new(ConnectionRegistry::new(Arc::clone(&aggregator)));
        let mode = Arc::new(SourceModeFlag::new(environment.default_synthetic()));

        let (ingest_tx, ingest_rx) = mpsc::channel(config.ingest_queue_capacity.max(1));
        let supervisor =
            SourceSupervisor::new(SourceSettings::from(&config), Arc::clone(&mode), ingest_tx);

        info!(
            "Initial synthetic log mode: {} (environment: {})",
            mode.use_synthetic(),
            environment
        );

        Arc::new(Self {
            config,
            environment,
            aggregator,
            registry,
            mode,
            supervisor,
            ingest_rx: Mutex::new(Some(ingest_rx)),
        })
    }

    /// Spawns the task that applies source records to the registry. The
    /// channel has a single consumer, so only the first call spawns anything.
    pub fn spawn_ingest_pump(&self) -> Option<JoinHandle<()>> {
        let mut rx = self
            .ingest_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        let registry = Arc::clone(&self.registry);

        Some(tokio::spawn(async move {
            debug!("Ingest pump started");
            while let Some(record) = rx.recv().await {
                registry.add_event(record);
            }
            debug!("Ingest pump stopped");
        }))
    }

    pub fn ensure_source_started(&self) -> bool {
        self.supervisor.ensure_started()
    }

    /// A fresh, not yet registered, subscriber session.
    pub fn new_session(&self) -> (SubscriberSession, mpsc::Receiver<String>) {
        SubscriberSession::new(self.config.session_queue_capacity)
    }

    pub fn scheduler_for(&self, session: &SubscriberSession) -> AggregationScheduler {
        AggregationScheduler::new(
            session.id,
            Arc::clone(&self.aggregator),
            Arc::clone(&self.registry),
            self.config.tick_interval(),
        )
    }

    pub fn shutdown(&self) {
        if self.supervisor.stop() {
            info!("Log event source stopped for shutdown");
        }
    }
}
