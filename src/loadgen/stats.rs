//! Attempt statistics for load runs
//!
//! Uses HDR Histogram for accurate latency percentile calculation.

use std::collections::HashMap;
use std::time::Duration;

use hdrhistogram::Histogram;

/// Latency statistics in milliseconds
#[derive(Debug, Clone, Default)]
pub struct LatencyStats {
    pub min_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
    pub stddev_ms: f64,
    pub p50_ms: f64,
    pub p75_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

/// Aggregated outcome of a load run
#[derive(Debug, Clone, Default)]
pub struct LoadStats {
    pub succeeded: u64,
    pub failed: u64,
    pub success_rate: f64,
    pub requests_per_second: f64,
    pub bytes_per_second: f64,
    pub total_bytes: u64,
    pub status_codes: HashMap<u16, u64>,
    pub errors: HashMap<String, u64>,
    pub latency: LatencyStats,
}

impl LoadStats {
    pub fn attempts(&self) -> u64 {
        self.succeeded + self.failed
    }
}

/// Collects per-attempt results as workers finish them
pub struct StatsCollector {
    /// latency histogram, microseconds
    histogram: Histogram<u64>,
    status_codes: HashMap<u16, u64>,
    errors: HashMap<String, u64>,
    succeeded: u64,
    failed: u64,
    total_bytes: u64,
}

const MAX_LATENCY_US: u64 = 300_000_000; // 5 minutes

impl StatsCollector {
    pub fn new() -> Self {
        let histogram = Histogram::new_with_bounds(1, MAX_LATENCY_US, 3)
            .expect("Failed to create histogram");

        Self {
            histogram,
            status_codes: HashMap::new(),
            errors: HashMap::new(),
            succeeded: 0,
            failed: 0,
            total_bytes: 0,
        }
    }

    /// Record one attempt. A missing status code means the attempt never
    /// produced a response; `error` names why. Only responses carry a
    /// latency into the histogram, so dead-on-arrival attempts cannot drag
    /// the minimum and low percentiles toward zero.
    pub fn record(
        &mut self,
        status_code: Option<u16>,
        latency: Duration,
        bytes: u64,
        error: Option<String>,
    ) {
        if let Some(code) = status_code {
            let latency_us = latency.as_micros() as u64;
            let _ = self.histogram.record(latency_us.clamp(1, MAX_LATENCY_US));

            *self.status_codes.entry(code).or_insert(0) += 1;

            if (200..400).contains(&code) {
                self.succeeded += 1;
            } else {
                self.failed += 1;
            }

            self.total_bytes += bytes;
        } else {
            self.failed += 1;

            if let Some(err) = error {
                *self.errors.entry(err).or_insert(0) += 1;
            }
        }
    }

    pub fn attempts(&self) -> u64 {
        self.succeeded + self.failed
    }

    /// Fold everything into final numbers over the run's wall time.
    pub fn finalize(self, duration: Duration) -> LoadStats {
        let total = self.succeeded + self.failed;
        let duration_secs = duration.as_secs_f64();

        let latency = if self.histogram.len() > 0 {
            LatencyStats {
                min_ms: self.histogram.min() as f64 / 1000.0,
                max_ms: self.histogram.max() as f64 / 1000.0,
                mean_ms: self.histogram.mean() / 1000.0,
                stddev_ms: self.histogram.stdev() / 1000.0,
                p50_ms: self.histogram.value_at_percentile(50.0) as f64 / 1000.0,
                p75_ms: self.histogram.value_at_percentile(75.0) as f64 / 1000.0,
                p90_ms: self.histogram.value_at_percentile(90.0) as f64 / 1000.0,
                p95_ms: self.histogram.value_at_percentile(95.0) as f64 / 1000.0,
                p99_ms: self.histogram.value_at_percentile(99.0) as f64 / 1000.0,
            }
        } else {
            LatencyStats::default()
        };

        LoadStats {
            succeeded: self.succeeded,
            failed: self.failed,
            success_rate: if total > 0 {
                self.succeeded as f64 / total as f64
            } else {
                0.0
            },
            requests_per_second: if duration_secs > 0.0 {
                total as f64 / duration_secs
            } else {
                0.0
            },
            bytes_per_second: if duration_secs > 0.0 {
                self.total_bytes as f64 / duration_secs
            } else {
                0.0
            },
            total_bytes: self.total_bytes,
            status_codes: self.status_codes,
            errors: self.errors,
            latency,
        }
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}
