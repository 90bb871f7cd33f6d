//! Shared scan counters
//!
//! All counters are atomic; workers update them concurrently without locks.
//! `total` grows late when recursion expands new tasks.

use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Stats {
    total: AtomicU64,
    processed: AtomicU64,
    found: AtomicU64,
    secrets: AtomicU64,
    waf_hits: AtomicU64,
    errors: AtomicU64,
    started_instant: Instant,
    started_at: DateTime<Local>,
}

impl Stats {
    pub fn new(initial_total: u64) -> Self {
        Self {
            total: AtomicU64::new(initial_total),
            processed: AtomicU64::new(0),
            found: AtomicU64::new(0),
            secrets: AtomicU64::new(0),
            waf_hits: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            started_instant: Instant::now(),
            started_at: Local::now(),
        }
    }

    pub fn add_total(&self, n: u64) {
        self.total.fetch_add(n, Ordering::Relaxed);
    }

    pub fn incr_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_found(&self) {
        self.found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_secrets(&self) {
        self.secrets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_waf_hits(&self) {
        self.waf_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn found(&self) -> u64 {
        self.found.load(Ordering::Relaxed)
    }

    pub fn secrets(&self) -> u64 {
        self.secrets.load(Ordering::Relaxed)
    }

    pub fn waf_hits(&self) -> u64 {
        self.waf_hits.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started_instant.elapsed()
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Processed requests per second since scan start.
    pub fn requests_per_second(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.processed() as f64 / secs
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = Stats::new(100);
        stats.incr_processed();
        stats.incr_processed();
        stats.incr_found();
        stats.incr_secrets();
        stats.incr_waf_hits();
        stats.incr_errors();
        stats.add_total(5);

        assert_eq!(stats.total(), 105);
        assert_eq!(stats.processed(), 2);
        assert_eq!(stats.found(), 1);
        assert_eq!(stats.secrets(), 1);
        assert_eq!(stats.waf_hits(), 1);
        assert_eq!(stats.errors(), 1);
    }
}
