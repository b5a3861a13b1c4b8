//! Live metrics: the rolling request window, its snapshots and the periodic
//! scheduler that pushes them to subscribers.

pub mod aggregator;
pub mod history;
pub mod scheduler;
pub mod types;

pub use aggregator::{AggregationWindow, MetricsAggregator};
pub use scheduler::AggregationScheduler;
pub use types::MetricsSnapshot;
