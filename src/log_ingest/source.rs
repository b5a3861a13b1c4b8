//! The log event source: a long-running task producing [`RequestLogRecord`]s.
//!
//! ```text
//!  SourceModeFlag ──watch──▶ LogEventSource ──mpsc──▶ ingest pump ──▶ ConnectionRegistry
//!                             │        │
//!                     live tail     synthetic
//!                    (subprocess)   generator
//! ```
//!
//! The source never touches the aggregator or the subscriber registry itself;
//! every record goes through the ingest channel and is applied by a single
//! consumer task on the runtime.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::live_tail::LiveTail;
use super::mode::{SourceMode, SourceModeFlag};
use super::parser::parse_log_line;
use super::synthetic::generate_batch;
use super::types::RequestLogRecord;
use crate::configuration::types::TailCommand;
use crate::configuration::Config;
use crate::error_handling::types::SourceError;

/// Static settings of the source, extracted from [`Config`].
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub tail_command: TailCommand,
    pub read_timeout: Option<Duration>,
    pub synthetic_interval: Duration,
}

impl From<&Config> for SourceSettings {
    fn from(config: &Config) -> Self {
        Self {
            tail_command: config.tail_command(),
            read_timeout: config.tail_read_timeout(),
            synthetic_interval: config.synthetic_interval(),
        }
    }
}

/// Why a live tail session ended without an error.
#[derive(Debug, PartialEq, Eq)]
enum LiveExit {
    ModeChanged,
    SinkClosed,
}

enum LiveEvent {
    Mode(bool),
    FlagDropped,
    Line(Result<String, SourceError>),
}

pub struct LogEventSource {
    settings: SourceSettings,
    flag: Arc<SourceModeFlag>,
    sink: mpsc::Sender<RequestLogRecord>,
    rng: StdRng,
    live_failed: bool,
}

impl LogEventSource {
    pub fn new(
        settings: SourceSettings,
        flag: Arc<SourceModeFlag>,
        sink: mpsc::Sender<RequestLogRecord>,
    ) -> Self {
        Self {
            settings,
            flag,
            sink,
            rng: StdRng::from_entropy(),
            live_failed: false,
        }
    }

    /// Mode actually used for the next iteration. Once the live tail has
    /// failed it stays on synthetic data for the rest of this run.
    pub fn effective_mode(&self) -> SourceMode {
        match self.flag.mode() {
            SourceMode::Live if self.live_failed => SourceMode::Synthetic,
            mode => mode,
        }
    }

    /// Runs until the ingest channel closes or the task is aborted.
    pub async fn run(mut self) {
        let mut mode_rx = self.flag.subscribe();
        info!("Log event source started in {:?} mode", self.flag.mode());

        loop {
            mode_rx.borrow_and_update();
            let keep_going = match self.effective_mode() {
                SourceMode::Synthetic => self.synthetic_iteration(&mut mode_rx).await,
                SourceMode::Live => match self.run_live(&mut mode_rx).await {
                    Ok(LiveExit::ModeChanged) => {
                        info!("Live tail stopped: source mode changed");
                        true
                    }
                    Ok(LiveExit::SinkClosed) => false,
                    Err(e) => {
                        warn!("{}; falling back to synthetic log generation", e);
                        self.live_failed = true;
                        true
                    }
                },
            };

            if !keep_going {
                break;
            }
        }

        info!("Log event source stopped: ingest channel closed");
    }

    /// Emits one synthetic batch then waits for the next iteration. A mode
    /// change cuts the wait short. Returns `false` when the sink is gone.
    async fn synthetic_iteration(&mut self, mode_rx: &mut watch::Receiver<bool>) -> bool {
        let batch = generate_batch(&mut self.rng);
        debug!("Generating {} synthetic requests", batch.len());

        for record in batch {
            debug!(
                "Synthetic request: {} {} - {}",
                record.method, record.path, record.status_code
            );
            if self.sink.send(record).await.is_err() {
                return false;
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(self.settings.synthetic_interval) => {}
            _ = mode_rx.changed() => {}
        }
        true
    }

    async fn run_live(&mut self, mode_rx: &mut watch::Receiver<bool>) -> Result<LiveExit, SourceError> {
        let mut tail = LiveTail::spawn(&self.settings.tail_command, self.settings.read_timeout)?;

        loop {
            let event = tokio::select! {
                changed = mode_rx.changed() => match changed {
                    Ok(()) => LiveEvent::Mode(*mode_rx.borrow_and_update()),
                    Err(_) => LiveEvent::FlagDropped,
                },
                line = tail.next_line() => LiveEvent::Line(line),
            };

            match event {
                LiveEvent::Mode(false) => continue,
                LiveEvent::Mode(true) | LiveEvent::FlagDropped => {
                    tail.shutdown().await;
                    return Ok(LiveExit::ModeChanged);
                }
                LiveEvent::Line(Ok(line)) => {
                    let Some(record) = parse_log_line(&line) else {
                        continue;
                    };
                    if self.sink.send(record).await.is_err() {
                        tail.shutdown().await;
                        return Ok(LiveExit::SinkClosed);
                    }
                }
                LiveEvent::Line(Err(e)) => {
                    tail.shutdown().await;
                    return Err(e);
                }
            }
        }
    }
}

/// Owns the single background source task.
///
/// `ensure_started` and `stop` both run under one lock, so concurrent
/// subscribers connecting at once still start at most one source.
pub struct SourceSupervisor {
    settings: SourceSettings,
    flag: Arc<SourceModeFlag>,
    sink: mpsc::Sender<RequestLogRecord>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SourceSupervisor {
    pub fn new(
        settings: SourceSettings,
        flag: Arc<SourceModeFlag>,
        sink: mpsc::Sender<RequestLogRecord>,
    ) -> Self {
        Self {
            settings,
            flag,
            sink,
            handle: Mutex::new(None),
        }
    }

    /// Starts the source unless it is already running. Returns `true` when a
    /// new task was spawned.
    pub fn ensure_started(&self) -> bool {
        let mut handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }

        info!("Starting log event source");
        let source = LogEventSource::new(
            self.settings.clone(),
            Arc::clone(&self.flag),
            self.sink.clone(),
        );
        *handle = Some(tokio::spawn(source.run()));
        true
    }

    /// Cancels the running source, if any. Returns `true` when a live task
    /// was cancelled.
    pub fn stop(&self) -> bool {
        let mut handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        match handle.take() {
            Some(h) if !h.is_finished() => {
                h.abort();
                info!("Log event source cancelled");
                true
            }
            _ => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for SourceSupervisor {
    fn drop(&mut self) {
        self.stop();
    }
}
