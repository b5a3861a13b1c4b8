//! Operator controls: source mode toggling and metric queries.

use std::sync::Arc;

use log::info;
use serde::Serialize;

use super::context::AppContext;
use crate::metrics::history::{synthetic_history, DEFAULT_HISTORY_MINUTES, MAX_HISTORY_MINUTES};
use crate::metrics::MetricsSnapshot;

/// Result of a mode toggle, also the JSON body of the toggle endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToggleOutcome {
    pub success: bool,
    pub use_dummy_logs: bool,
    pub environment: String,
    pub message: String,
}

/// Current source mode, also the JSON body of the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceStatus {
    pub use_dummy_logs: bool,
    pub environment: String,
    pub is_production: bool,
}

#[derive(Clone)]
pub struct ControlSurface {
    ctx: Arc<AppContext>,
}

impl ControlSurface {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// Switches synthetic generation on or off.
    ///
    /// A running source is always cancelled first. Enabling restarts it right
    /// away; disabling leaves it stopped until the next subscriber connects,
    /// which starts it again in live mode. Always reports success: a restart
    /// that turns out to be a no-op is not a user-visible failure.
    pub fn toggle(&self, enabled: bool) -> ToggleOutcome {
        self.ctx.mode.set(enabled);

        if self.ctx.supervisor.stop() {
            info!("Running log source cancelled by toggle");
        }
        if enabled {
            self.ctx.ensure_source_started();
        }

        ToggleOutcome {
            success: true,
            use_dummy_logs: self.ctx.mode.use_synthetic(),
            environment: self.ctx.environment.to_string(),
            message: format!(
                "Synthetic log mode {}",
                if enabled { "enabled" } else { "disabled" }
            ),
        }
    }

    /// Snapshot of the current window, rolling it first if it has expired.
    pub fn current_metrics(&self) -> MetricsSnapshot {
        self.ctx.aggregator.maybe_reset();
        self.ctx.aggregator.snapshot()
    }

    /// Placeholder history, see [`synthetic_history`].
    ///
    /// Non-positive `minutes` yield an empty history.
    pub fn history(&self, minutes: Option<i64>) -> Vec<MetricsSnapshot> {
        let minutes = minutes
            .map(|m| m.clamp(0, i64::from(MAX_HISTORY_MINUTES)))
            .and_then(|m| u32::try_from(m).ok())
            .unwrap_or(DEFAULT_HISTORY_MINUTES);
        synthetic_history(minutes, &mut rand::thread_rng())
    }

    pub fn status(&self) -> SourceStatus {
        SourceStatus {
            use_dummy_logs: self.ctx.mode.use_synthetic(),
            environment: self.ctx.environment.to_string(),
            is_production: self.ctx.environment.is_production(),
        }
    }
}
