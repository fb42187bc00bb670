use std::collections::HashMap;

use crate::classify::{ErrorBucket, ErrorSample, ResponseOutcome};

/// Samples retained per bucket, first come first kept.
pub const MAX_SAMPLES_PER_BUCKET: usize = 3;

/// Status and error bookkeeping for one run.
///
/// Each virtual user owns one of these; the runner merges them once all iterations are done.
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator {
    status_counts: HashMap<u16, u64>,
    status_order: Vec<u16>,
    auth_errors: u64,
    client_errors: u64,
    server_errors: u64,
    transport_failures: u64,
    samples: [Vec<ErrorSample>; 3],
}

fn slot(bucket: ErrorBucket) -> usize {
    match bucket {
        ErrorBucket::Auth => 0,
        ErrorBucket::Client => 1,
        ErrorBucket::Server => 2,
    }
}

impl MetricsAggregator {
    pub fn record(&mut self, outcome: &ResponseOutcome, url: &str) {
        if let Some(status) = outcome.status() {
            self.record_status(status);
        } else {
            self.transport_failures = self.transport_failures.saturating_add(1);
        }

        if let (Some(bucket), Some(sample)) = (outcome.bucket(), outcome.sample(url)) {
            self.record_error(bucket, sample);
        }
    }

    fn record_status(&mut self, status: u16) {
        let count = self.status_counts.entry(status).or_insert(0);
        if *count == 0 {
            self.status_order.push(status);
        }
        *count = count.saturating_add(1);
    }

    fn record_error(&mut self, bucket: ErrorBucket, sample: ErrorSample) {
        let counter = match bucket {
            ErrorBucket::Auth => &mut self.auth_errors,
            ErrorBucket::Client => &mut self.client_errors,
            ErrorBucket::Server => &mut self.server_errors,
        };
        *counter = counter.saturating_add(1);

        let samples = &mut self.samples[slot(bucket)];
        if samples.len() < MAX_SAMPLES_PER_BUCKET {
            samples.push(sample);
        }
    }

    /// Fold `other` into `self`: counts are summed, unseen statuses appended in their
    /// first-seen order, and samples concatenated then re-capped.
    pub fn merge(&mut self, other: MetricsAggregator) {
        for status in other.status_order {
            let n = other.status_counts.get(&status).copied().unwrap_or(0);
            let count = self.status_counts.entry(status).or_insert(0);
            if *count == 0 {
                self.status_order.push(status);
            }
            *count = count.saturating_add(n);
        }

        self.auth_errors = self.auth_errors.saturating_add(other.auth_errors);
        self.client_errors = self.client_errors.saturating_add(other.client_errors);
        self.server_errors = self.server_errors.saturating_add(other.server_errors);
        self.transport_failures = self
            .transport_failures
            .saturating_add(other.transport_failures);

        for (mine, theirs) in self.samples.iter_mut().zip(other.samples) {
            let room = MAX_SAMPLES_PER_BUCKET.saturating_sub(mine.len());
            mine.extend(theirs.into_iter().take(room));
        }
    }

    #[must_use]
    pub fn status_count(&self, status: u16) -> u64 {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }

    /// Distinct statuses in first-seen order.
    #[must_use]
    pub fn status_order(&self) -> &[u16] {
        &self.status_order
    }

    /// Responses that carried a status. Together with
    /// [`transport_failures`](Self::transport_failures) this equals the number of requests.
    #[must_use]
    pub fn total_statuses(&self) -> u64 {
        self.status_counts.values().sum()
    }

    #[must_use]
    pub fn transport_failures(&self) -> u64 {
        self.transport_failures
    }

    #[must_use]
    pub fn error_count(&self, bucket: ErrorBucket) -> u64 {
        match bucket {
            ErrorBucket::Auth => self.auth_errors,
            ErrorBucket::Client => self.client_errors,
            ErrorBucket::Server => self.server_errors,
        }
    }

    #[must_use]
    pub fn samples(&self, bucket: ErrorBucket) -> &[ErrorSample] {
        &self.samples[slot(bucket)]
    }

    #[must_use]
    pub fn has_error_samples(&self) -> bool {
        self.samples.iter().any(|s| !s.is_empty())
    }

    /// First `n` distinct statuses with their counts, in first-seen order.
    #[must_use]
    pub fn top_statuses(&self, n: usize) -> Vec<(u16, u64)> {
        self.status_order
            .iter()
            .take(n)
            .map(|s| (*s, self.status_count(*s)))
            .collect()
    }

    #[must_use]
    pub fn min_status(&self) -> Option<u16> {
        self.status_order.iter().copied().min()
    }

    #[must_use]
    pub fn max_status(&self) -> Option<u16> {
        self.status_order.iter().copied().max()
    }

    /// Nearest-rank percentile over every recorded status, weighted by count.
    #[must_use]
    pub fn status_percentile(&self, p: f64) -> Option<u16> {
        let total = self.total_statuses();
        if total == 0 || !p.is_finite() {
            return None;
        }

        let rank = ((p.clamp(0.0, 100.0) / 100.0) * total as f64).ceil().max(1.0) as u64;

        let mut sorted: Vec<u16> = self.status_order.clone();
        sorted.sort_unstable();

        let mut seen = 0u64;
        for status in sorted {
            seen = seen.saturating_add(self.status_count(status));
            if seen >= rank {
                return Some(status);
            }
        }
        self.max_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ReportingProfile;

    const URL: &str = "http://target/ok";

    fn status(agg: &mut MetricsAggregator, code: u16) {
        let outcome = ResponseOutcome::from_status(code, None, ReportingProfile::Extended);
        agg.record(&outcome, URL);
    }

    #[test]
    fn repeated_403_counts_every_hit_but_keeps_three_samples() {
        let mut agg = MetricsAggregator::default();
        status(&mut agg, 403);
        assert_eq!(agg.error_count(ErrorBucket::Auth), 1);
        assert_eq!(agg.samples(ErrorBucket::Auth).len(), 1);
        assert_eq!(agg.samples(ErrorBucket::Auth)[0].status, 403);

        for _ in 0..9 {
            status(&mut agg, 403);
        }
        assert_eq!(agg.error_count(ErrorBucket::Auth), 10);
        assert_eq!(agg.samples(ErrorBucket::Auth).len(), MAX_SAMPLES_PER_BUCKET);
        assert_eq!(agg.status_count(403), 10);
    }

    #[test]
    fn transport_failure_leaves_status_counts_untouched() {
        let mut agg = MetricsAggregator::default();
        agg.record(&ResponseOutcome::transport_failure("connection refused"), URL);

        assert_eq!(agg.total_statuses(), 0);
        assert!(agg.status_order().is_empty());
        assert_eq!(agg.transport_failures(), 1);
        assert_eq!(agg.error_count(ErrorBucket::Server), 1);
        assert_eq!(agg.samples(ErrorBucket::Server)[0].message, "connection refused");
    }

    #[test]
    fn statuses_plus_transport_failures_equal_iterations() {
        let mut agg = MetricsAggregator::default();
        let codes = [200, 0, 404, 200, 503, 401, 204];
        let mut n = 0u64;
        for (i, code) in codes.iter().cycle().take(40).enumerate() {
            if i % 3 == 0 {
                agg.record(&ResponseOutcome::transport_failure("reset"), URL);
            } else {
                status(&mut agg, *code);
            }
            n += 1;
        }
        assert_eq!(agg.total_statuses() + agg.transport_failures(), n);
    }

    #[test]
    fn status_order_is_first_seen() {
        let mut agg = MetricsAggregator::default();
        for code in [503, 200, 503, 404, 200, 201, 202, 204] {
            status(&mut agg, code);
        }
        assert_eq!(agg.status_order(), &[503, 200, 404, 201, 202, 204]);
        assert_eq!(
            agg.top_statuses(5),
            vec![(503, 2), (200, 2), (404, 1), (201, 1), (202, 1)]
        );
    }

    #[test]
    fn merge_sums_counts_and_recaps_samples() {
        let mut a = MetricsAggregator::default();
        let mut b = MetricsAggregator::default();
        status(&mut a, 200);
        status(&mut a, 500);
        status(&mut a, 500);
        status(&mut b, 404);
        status(&mut b, 500);
        status(&mut b, 500);
        b.record(&ResponseOutcome::transport_failure("timeout"), URL);

        a.merge(b);

        assert_eq!(a.status_order(), &[200, 500, 404]);
        assert_eq!(a.status_count(500), 4);
        assert_eq!(a.error_count(ErrorBucket::Server), 5);
        assert_eq!(a.error_count(ErrorBucket::Client), 1);
        assert_eq!(a.transport_failures(), 1);
        assert_eq!(a.samples(ErrorBucket::Server).len(), MAX_SAMPLES_PER_BUCKET);
        assert_eq!(a.total_statuses() + a.transport_failures(), 7);
    }

    #[test]
    fn status_percentiles_use_nearest_rank() {
        let mut agg = MetricsAggregator::default();
        for _ in 0..9 {
            status(&mut agg, 200);
        }
        status(&mut agg, 500);

        assert_eq!(agg.status_percentile(50.0), Some(200));
        assert_eq!(agg.status_percentile(90.0), Some(200));
        assert_eq!(agg.status_percentile(99.0), Some(500));
        assert_eq!(agg.min_status(), Some(200));
        assert_eq!(agg.max_status(), Some(500));
        assert_eq!(MetricsAggregator::default().status_percentile(50.0), None);
    }
}
