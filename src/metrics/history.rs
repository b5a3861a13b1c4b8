//! Placeholder per-minute history.
//!
//! Nothing is retained past the live window, so this produces a plausible
//! random walk for charts to draw. It is not derived from recorded traffic.

use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;

use super::types::MetricsSnapshot;

pub const DEFAULT_HISTORY_MINUTES: u32 = 20;
pub const MAX_HISTORY_MINUTES: u32 = 60;

/// One entry per minute for the last `minutes` minutes (capped at 60),
/// oldest first.
pub fn synthetic_history<R: Rng + ?Sized>(minutes: u32, rng: &mut R) -> Vec<MetricsSnapshot> {
    let count = minutes.min(MAX_HISTORY_MINUTES);
    let now = Utc::now();

    let mut requests: i64 = rng.gen_range(5..=50);
    let mut latency: f64 = rng.gen_range(50.0..=200.0);

    (0..count)
        .map(|i| {
            requests = (requests + rng.gen_range(-5..=5)).clamp(5, 50);
            latency = (latency + rng.gen_range(-15.0..=15.0)).clamp(50.0, 200.0);
            let request_count = requests as usize;
            let error_count = rng.gen_range(0..=5usize).min(request_count);

            MetricsSnapshot {
                timestamp: (now - ChronoDuration::minutes(i64::from(count - i))).to_rfc3339(),
                request_count,
                avg_duration_ms: latency,
                error_count,
                success_rate: (request_count - error_count) as f64 / request_count as f64 * 100.0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn history_is_capped_at_an_hour() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(synthetic_history(5, &mut rng).len(), 5);
        assert_eq!(synthetic_history(60, &mut rng).len(), 60);
        assert_eq!(synthetic_history(600, &mut rng).len(), 60);
        assert!(synthetic_history(0, &mut rng).is_empty());
    }

    #[test]
    fn entries_are_ordered_and_plausible() {
        let mut rng = StdRng::seed_from_u64(9);
        let history = synthetic_history(30, &mut rng);

        let times: Vec<DateTime<Utc>> = history
            .iter()
            .map(|e| DateTime::parse_from_rfc3339(&e.timestamp).unwrap().with_timezone(&Utc))
            .collect();
        assert!(times.windows(2).all(|w| w[0] < w[1]));

        for entry in &history {
            assert!((5..=50).contains(&entry.request_count));
            assert!(entry.error_count <= entry.request_count);
            assert!((50.0..=200.0).contains(&entry.avg_duration_ms));
            assert!((0.0..=100.0).contains(&entry.success_rate));
        }
    }
}
