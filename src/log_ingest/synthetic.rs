//! Synthetic request generator used when no real log stream is available.

use rand::seq::SliceRandom;
use rand::Rng;

use super::types::RequestLogRecord;

pub const METHODS: [&str; 4] = ["GET", "POST", "PUT", "DELETE"];

pub const PATHS: [&str; 4] = [
    "/api/etf/list",
    "/api/stocks/AAPL",
    "/api/chat/",
    "/api/news/market",
];

/// `(status, weight)` pairs, weights sum to 100.
pub const STATUS_WEIGHTS: [(u16, u32); 5] = [(200, 85), (201, 5), (400, 5), (404, 3), (500, 2)];

pub const MIN_DURATION_MS: f64 = 10.0;
pub const MAX_DURATION_MS: f64 = 300.0;

pub const MIN_BATCH: usize = 1;
pub const MAX_BATCH: usize = 3;

/// Draws one status code from [`STATUS_WEIGHTS`].
pub fn weighted_status<R: Rng + ?Sized>(rng: &mut R) -> u16 {
    STATUS_WEIGHTS
        .choose_weighted(rng, |(_, weight)| *weight)
        .map(|(status, _)| *status)
        .unwrap_or(STATUS_WEIGHTS[0].0)
}

pub fn generate_record<R: Rng + ?Sized>(rng: &mut R) -> RequestLogRecord {
    let method = METHODS.choose(rng).copied().unwrap_or("GET");
    let path = PATHS.choose(rng).copied().unwrap_or("/");
    let status = weighted_status(rng);
    let duration = rng.gen_range(MIN_DURATION_MS..=MAX_DURATION_MS);

    RequestLogRecord::now(method, path, status, duration)
}

/// One iteration worth of fake traffic: between 1 and 3 records.
pub fn generate_batch<R: Rng + ?Sized>(rng: &mut R) -> Vec<RequestLogRecord> {
    let count = rng.gen_range(MIN_BATCH..=MAX_BATCH);
    (0..count).map(|_| generate_record(rng)).collect()
}
