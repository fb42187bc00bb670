/// Latency distribution in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencySummary {
    pub avg: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub p90: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
}

/// Run-level statistics handed to the reporter.
///
/// Every field is optional: a run that never reached the target still produces a
/// snapshot, and the reporter renders absent values as `n/a`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStatistics {
    pub requests_total: Option<u64>,
    pub requests_per_sec: Option<f64>,
    /// Failed requests / total requests (0..=1).
    pub failed_rate: Option<f64>,
    pub latency: LatencySummary,
    pub iterations_total: Option<u64>,
    pub iterations_per_sec: Option<f64>,
    pub bytes_sent: Option<u64>,
    pub bytes_received: Option<u64>,
    pub vus_current: Option<u64>,
    pub vus_max: Option<u64>,
    pub checks_passed: Option<u64>,
    pub checks_failed: Option<u64>,
}

impl RunStatistics {
    #[must_use]
    pub fn success_rate(&self) -> Option<f64> {
        self.failed_rate.map(|r| (1.0 - r).clamp(0.0, 1.0))
    }

    #[must_use]
    pub fn failed_requests(&self) -> Option<u64> {
        let total = self.requests_total?;
        let rate = self.failed_rate?;
        Some((total as f64 * rate).round() as u64)
    }
}
