use chrono::Utc;
use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub attempts: u64,
    pub successes: u64,
    pub skipped: u64,
    pub failed: u64,
    pub success_rate: f64,
    pub remote_calls: u64,
    pub avg_latency_ms: f64,
    pub elapsed_secs: u64,
}

/// Cumulative counters for one bot run.
///
/// Owned by the loop that drives the run; there is exactly one writer.
#[derive(Debug)]
pub struct MetricsCollector {
    attempts: u64,
    successes: u64,
    skipped: u64,
    failed: u64,
    remote_calls: u64,
    remote_latency_sum_ms: u64,
    start_time: Instant,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            attempts: 0,
            successes: 0,
            skipped: 0,
            failed: 0,
            remote_calls: 0,
            remote_latency_sum_ms: 0,
            start_time: Instant::now(),
        }
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.attempts += 1;
        self.successes += 1;
    }

    pub fn record_skipped(&mut self) {
        self.attempts += 1;
        self.skipped += 1;
    }

    pub fn record_failure(&mut self) {
        self.attempts += 1;
        self.failed += 1;
    }

    pub fn record_remote_call(&mut self, latency: Duration) {
        self.remote_calls += 1;
        self.remote_latency_sum_ms += latency.as_millis() as u64;
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn successes(&self) -> u64 {
        self.successes
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let success_rate = if self.attempts > 0 {
            (self.successes as f64 / self.attempts as f64) * 100.0
        } else {
            0.0
        };
        let avg_latency_ms = if self.remote_calls > 0 {
            self.remote_latency_sum_ms as f64 / self.remote_calls as f64
        } else {
            0.0
        };

        MetricsSnapshot {
            timestamp: Utc::now().to_rfc3339(),
            attempts: self.attempts,
            successes: self.successes,
            skipped: self.skipped,
            failed: self.failed,
            success_rate,
            remote_calls: self.remote_calls,
            avg_latency_ms,
            elapsed_secs: self.start_time.elapsed().as_secs(),
        }
    }
}
