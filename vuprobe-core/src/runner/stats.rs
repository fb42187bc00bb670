use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::summary::{LatencySummary, RunStatistics};

/// One attempted request, as the runner sees it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSample {
    pub elapsed: Duration,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    /// Transport error, status 0 or status >= 400.
    pub failed: bool,
}

#[derive(Debug)]
pub struct RunStats {
    requests_total: AtomicU64,
    requests_failed: AtomicU64,
    iterations_total: AtomicU64,
    checks_passed: AtomicU64,
    checks_failed: AtomicU64,
    bytes_sent_total: AtomicU64,
    bytes_received_total: AtomicU64,
    vus_active: AtomicU64,
    vus_max: AtomicU64,
    latency_us: Mutex<Histogram<u64>>,
}

impl Default for RunStats {
    fn default() -> Self {
        // Track up to 60s in microseconds (with 3 sigfigs).
        let hist = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3)
            .unwrap_or_else(|err| panic!("failed to init histogram: {err}"));

        Self {
            requests_total: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            iterations_total: AtomicU64::new(0),
            checks_passed: AtomicU64::new(0),
            checks_failed: AtomicU64::new(0),
            bytes_sent_total: AtomicU64::new(0),
            bytes_received_total: AtomicU64::new(0),
            vus_active: AtomicU64::new(0),
            vus_max: AtomicU64::new(0),
            latency_us: Mutex::new(hist),
        }
    }
}

/// Keeps a VU counted as active until dropped.
#[derive(Debug)]
pub struct ActiveVu<'a> {
    stats: &'a RunStats,
}

impl Drop for ActiveVu<'_> {
    fn drop(&mut self) {
        self.stats.vus_active.fetch_sub(1, Ordering::AcqRel);
    }
}

impl RunStats {
    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn failed_requests_total(&self) -> u64 {
        self.requests_failed.load(Ordering::Relaxed)
    }

    pub fn iterations_total(&self) -> u64 {
        self.iterations_total.load(Ordering::Relaxed)
    }

    pub fn vus_active(&self) -> u64 {
        self.vus_active.load(Ordering::Acquire)
    }

    pub fn vus_max(&self) -> u64 {
        self.vus_max.load(Ordering::Acquire)
    }

    pub fn enter_vu(&self) -> ActiveVu<'_> {
        let now = self.vus_active.fetch_add(1, Ordering::AcqRel).saturating_add(1);

        let mut peak = self.vus_max.load(Ordering::Acquire);
        while now > peak {
            match self
                .vus_max
                .compare_exchange_weak(peak, now, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break,
                Err(seen) => peak = seen,
            }
        }

        ActiveVu { stats: self }
    }

    pub fn record_request(&self, sample: RequestSample) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if sample.failed {
            self.requests_failed.fetch_add(1, Ordering::Relaxed);
        }
        if sample.bytes_sent != 0 {
            self.bytes_sent_total
                .fetch_add(sample.bytes_sent, Ordering::Relaxed);
        }
        if sample.bytes_received != 0 {
            self.bytes_received_total
                .fetch_add(sample.bytes_received, Ordering::Relaxed);
        }

        // Sub-microsecond requests still count towards the distribution.
        let us = u64::try_from(sample.elapsed.as_micros()).unwrap_or(u64::MAX).max(1);
        self.latency_us.lock().saturating_record(us);
    }

    pub fn record_check(&self, ok: bool) {
        if ok {
            self.checks_passed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.checks_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_iteration(&self) {
        self.iterations_total.fetch_add(1, Ordering::Relaxed);
    }

    fn latency_summary(&self) -> LatencySummary {
        let h = self.latency_us.lock();

        #[allow(clippy::len_zero)]
        if h.len() == 0 {
            return LatencySummary::default();
        }

        let ms = |us: u64| Some(us as f64 / 1000.0);
        LatencySummary {
            avg: Some(h.mean() / 1000.0),
            min: ms(h.min()),
            max: ms(h.max()),
            p50: ms(h.value_at_quantile(0.50)),
            p75: ms(h.value_at_quantile(0.75)),
            p90: ms(h.value_at_quantile(0.90)),
            p95: ms(h.value_at_quantile(0.95)),
            p99: ms(h.value_at_quantile(0.99)),
        }
    }

    /// Point-in-time statistics; rates are per second of `elapsed`.
    pub fn snapshot(&self, elapsed: Duration) -> RunStatistics {
        let requests = self.requests_total();
        let iterations = self.iterations_total();
        let secs = elapsed.as_secs_f64();
        let per_sec = |n: u64| (secs > 0.0).then(|| n as f64 / secs);

        RunStatistics {
            requests_total: Some(requests),
            requests_per_sec: per_sec(requests),
            failed_rate: (requests > 0)
                .then(|| self.failed_requests_total() as f64 / requests as f64),
            latency: self.latency_summary(),
            iterations_total: Some(iterations),
            iterations_per_sec: per_sec(iterations),
            bytes_sent: Some(self.bytes_sent_total.load(Ordering::Relaxed)),
            bytes_received: Some(self.bytes_received_total.load(Ordering::Relaxed)),
            vus_current: Some(self.vus_active()),
            vus_max: Some(self.vus_max()),
            checks_passed: Some(self.checks_passed.load(Ordering::Relaxed)),
            checks_failed: Some(self.checks_failed.load(Ordering::Relaxed)),
        }
    }
}
