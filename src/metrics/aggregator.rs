//! Rolling request window and the statistics computed over it.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use log::debug;
use tokio::time::Instant;

use super::types::MetricsSnapshot;
use crate::log_ingest::types::RequestLogRecord;

/// Records seen since the last reset.
#[derive(Debug)]
pub struct AggregationWindow {
    pub buffer: Vec<RequestLogRecord>,
    pub last_reset: Instant,
}

impl AggregationWindow {
    fn new(now: Instant) -> Self {
        Self {
            buffer: Vec::new(),
            last_reset: now,
        }
    }
}

/// Owns the [`AggregationWindow`].
///
/// The window is only ever appended to or cleared as a whole, each under the
/// lock, so a snapshot always sees whole records. Resetting is never implied
/// by `record`: callers check [`MetricsAggregator::maybe_reset`] on their own
/// clock so an idle window reports zero instead of stale numbers.
#[derive(Debug)]
pub struct MetricsAggregator {
    window: Mutex<AggregationWindow>,
    length: Duration,
}

impl MetricsAggregator {
    pub fn new(length: Duration) -> Self {
        Self {
            window: Mutex::new(AggregationWindow::new(Instant::now())),
            length,
        }
    }

    fn lock(&self) -> MutexGuard<'_, AggregationWindow> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn window_length(&self) -> Duration {
        self.length
    }

    /// Appends one record to the current window.
    pub fn record(&self, event: RequestLogRecord) {
        self.lock().buffer.push(event);
    }

    /// Computes count, mean latency, error count and success rate.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let window = self.lock();
        let request_count = window.buffer.len();
        if request_count == 0 {
            return MetricsSnapshot::empty();
        }

        let total_duration: f64 = window.buffer.iter().map(|r| r.duration_ms).sum();
        let error_count = window.buffer.iter().filter(|r| r.is_error()).count();
        let success_count = request_count - error_count;

        MetricsSnapshot {
            timestamp: Utc::now().to_rfc3339(),
            request_count,
            avg_duration_ms: total_duration / request_count as f64,
            error_count,
            success_rate: success_count as f64 / request_count as f64 * 100.0,
        }
    }

    /// Clears the window if at least one window length has elapsed since the
    /// last reset. Returns `true` when it did.
    pub fn maybe_reset(&self) -> bool {
        self.maybe_reset_at(Instant::now())
    }

    pub fn maybe_reset_at(&self, now: Instant) -> bool {
        let mut window = self.lock();
        if now.saturating_duration_since(window.last_reset) < self.length {
            return false;
        }

        debug!(
            "Resetting aggregation window ({} records)",
            window.buffer.len()
        );
        window.buffer.clear();
        window.last_reset = now;
        true
    }

    pub fn len(&self) -> usize {
        self.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last_reset(&self) -> Instant {
        self.lock().last_reset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn rec(status: u16, duration: f64) -> RequestLogRecord {
        RequestLogRecord::now("GET", "/api/etf/list", status, duration)
    }

    #[test]
    fn empty_window_is_vacuously_successful() {
        let aggregator = MetricsAggregator::new(Duration::from_secs(60));
        let snapshot = aggregator.snapshot();

        assert_eq!(snapshot.request_count, 0);
        assert_eq!(snapshot.avg_duration_ms, 0.0);
        assert_eq!(snapshot.error_count, 0);
        assert_eq!(snapshot.success_rate, 100.0);
    }

    #[test]
    fn snapshot_counts_errors_and_averages() {
        let aggregator = MetricsAggregator::new(Duration::from_secs(60));
        for (status, duration) in [(200, 10.0), (201, 20.0), (404, 30.0), (500, 40.0), (200, 50.0)] {
            aggregator.record(rec(status, duration));
        }

        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.request_count, 5);
        assert_eq!(snapshot.error_count, 2);
        assert!((snapshot.avg_duration_ms - 30.0).abs() < 1e-9);
        assert!((snapshot.success_rate - 60.0).abs() < 1e-9);
    }

    #[test]
    fn success_rate_matches_formula_for_many_mixes() {
        for n in 1..=40usize {
            for e in 0..=n {
                let aggregator = MetricsAggregator::new(Duration::from_secs(60));
                for i in 0..n {
                    aggregator.record(rec(if i < e { 500 } else { 200 }, 1.0));
                }
                let snapshot = aggregator.snapshot();
                let expected = (n - e) as f64 / n as f64 * 100.0;
                assert_eq!(snapshot.error_count, e);
                assert!((snapshot.success_rate - expected).abs() < 1e-9);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reset_happens_only_after_window_elapsed() {
        let aggregator = MetricsAggregator::new(Duration::from_secs(60));
        aggregator.record(rec(200, 5.0));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!aggregator.maybe_reset());
        assert_eq!(aggregator.len(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(aggregator.maybe_reset());
        assert!(aggregator.is_empty());
        assert_eq!(aggregator.snapshot().success_rate, 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn at_most_one_reset_per_interval() {
        let aggregator = MetricsAggregator::new(Duration::from_secs(60));
        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(aggregator.maybe_reset());
        aggregator.record(rec(200, 5.0));
        assert!(!aggregator.maybe_reset());
        assert_eq!(aggregator.len(), 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!aggregator.maybe_reset());
        assert_eq!(aggregator.len(), 1);
    }

    #[test]
    fn concurrent_records_are_never_lost() {
        let aggregator = Arc::new(MetricsAggregator::new(Duration::from_secs(60)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let aggregator = Arc::clone(&aggregator);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        aggregator.record(rec(200, 1.0));
                        let snapshot = aggregator.snapshot();
                        assert!(snapshot.request_count >= 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(aggregator.snapshot().request_count, 2000);
    }
}
