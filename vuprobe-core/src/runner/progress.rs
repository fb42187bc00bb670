use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Monotonic tick counter (1-based).
    pub tick: u64,
    pub elapsed: Duration,
    /// Planned run length.
    pub duration: Duration,
    pub vus: u64,
    pub vus_active: u64,
    pub requests_total: u64,
    pub failed_requests_total: u64,
    pub iterations_total: u64,
    /// Requests/sec observed during the last interval.
    pub rps_now: f64,
}

pub type ProgressFn = std::sync::Arc<dyn Fn(ProgressUpdate) + Send + Sync + 'static>;
