use std::time::{Duration, Instant};

use tracing::debug;

use crate::aggregator::MetricsAggregator;
use crate::classify::ResponseOutcome;
use crate::policy::{ReportingProfile, request_failed};
use crate::request::RequestDescriptor;
use crate::runner::{RequestSample, RunStats};
use crate::transport::Transport;

/// The one request every virtual user repeats, plus how to judge it.
#[derive(Debug)]
pub struct Scenario<T> {
    request: RequestDescriptor,
    policy: ReportingProfile,
    pause: Duration,
    transport: T,
}

impl<T: Transport> Scenario<T> {
    pub fn new(
        request: RequestDescriptor,
        policy: ReportingProfile,
        pause: Duration,
        transport: T,
    ) -> Self {
        Self {
            request,
            policy,
            pause,
            transport,
        }
    }

    pub fn request(&self) -> &RequestDescriptor {
        &self.request
    }

    /// Issue one request, classify it into `agg`, then pause.
    ///
    /// Returns `None` when no target is configured.
    pub async fn run_iteration(
        &self,
        agg: &mut MetricsAggregator,
        stats: &RunStats,
    ) -> Option<ResponseOutcome> {
        let outcome = match self.request.url() {
            None => {
                debug!("no TARGET_URL or API_BASE_URL; skipping request");
                None
            }
            Some(url) => Some(self.exchange(url, agg, stats).await),
        };

        self.pause().await;
        stats.record_iteration();
        outcome
    }

    async fn exchange(
        &self,
        url: &str,
        agg: &mut MetricsAggregator,
        stats: &RunStats,
    ) -> ResponseOutcome {
        let started = Instant::now();
        let result = self.transport.send(&self.request, url).await;
        let elapsed = started.elapsed();

        let outcome = match result {
            Ok(res) => {
                stats.record_request(RequestSample {
                    elapsed,
                    bytes_sent: res.bytes_sent,
                    bytes_received: res.bytes_received,
                    failed: request_failed(res.status),
                });
                stats.record_check(self.policy.status_ok(res.status));
                ResponseOutcome::from_status(res.status, res.message.as_deref(), self.policy)
            }
            Err(err) => {
                stats.record_request(RequestSample {
                    elapsed,
                    failed: true,
                    ..RequestSample::default()
                });
                ResponseOutcome::transport_failure(&err.message)
            }
        };

        agg.record(&outcome, url);
        outcome
    }

    async fn pause(&self) {
        if self.pause.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.pause).await;
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::classify::ErrorBucket;
    use crate::transport::{TransportError, TransportResponse};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Replays a fixed script of results, then repeats the last one.
    struct Scripted {
        results: Mutex<Vec<Result<TransportResponse, TransportError>>>,
    }

    impl Scripted {
        fn new(mut results: Vec<Result<TransportResponse, TransportError>>) -> Self {
            results.reverse();
            Self {
                results: Mutex::new(results),
            }
        }
    }

    impl Transport for Scripted {
        async fn send(
            &self,
            _req: &RequestDescriptor,
            _url: &str,
        ) -> Result<TransportResponse, TransportError> {
            let mut results = self.results.lock().unwrap();
            if results.len() > 1 {
                results.pop().unwrap()
            } else {
                results.last().cloned().unwrap()
            }
        }
    }

    fn status(code: u16) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse {
            status: code,
            message: None,
            bytes_sent: 10,
            bytes_received: 20,
        })
    }

    fn refused() -> Result<TransportResponse, TransportError> {
        Err(TransportError {
            message: "connection refused".to_string(),
        })
    }

    fn scenario(
        url: Option<&str>,
        policy: ReportingProfile,
        script: Vec<Result<TransportResponse, TransportError>>,
    ) -> Scenario<Scripted> {
        let request = RequestDescriptor::new(
            crate::request::HttpMethod::Get,
            url.map(str::to_string),
            BTreeMap::new(),
            None,
        );
        Scenario::new(request, policy, Duration::ZERO, Scripted::new(script))
    }

    #[tokio::test]
    async fn forbidden_goes_to_auth_bucket() {
        let s = scenario(Some("http://t/x"), ReportingProfile::Extended, vec![status(403)]);
        let stats = RunStats::default();
        let mut agg = MetricsAggregator::default();

        for _ in 0..5 {
            s.run_iteration(&mut agg, &stats).await;
        }

        assert_eq!(agg.error_count(ErrorBucket::Auth), 5);
        assert_eq!(agg.samples(ErrorBucket::Auth).len(), 3);
        assert!(agg.samples(ErrorBucket::Auth).iter().all(|s| s.status == 403));
        assert_eq!(stats.failed_requests_total(), 5);
    }

    #[tokio::test]
    async fn transport_failure_counts_request_but_no_status_or_check() {
        let s = scenario(Some("http://t/x"), ReportingProfile::Extended, vec![refused()]);
        let stats = RunStats::default();
        let mut agg = MetricsAggregator::default();

        let outcome = s.run_iteration(&mut agg, &stats).await;

        assert!(matches!(outcome, Some(ResponseOutcome::TransportFailure { .. })));
        assert_eq!(agg.total_statuses(), 0);
        assert_eq!(agg.error_count(ErrorBucket::Server), 1);
        let snap = stats.snapshot(Duration::from_secs(1));
        assert_eq!(snap.failed_rate, Some(1.0));
        assert_eq!(snap.checks_passed, Some(0));
        assert_eq!(snap.checks_failed, Some(0));
    }

    #[tokio::test]
    async fn iterations_are_statuses_plus_transport_failures() {
        let script = vec![
            status(200),
            refused(),
            status(404),
            status(500),
            refused(),
            status(0),
            status(201),
        ];
        let n = script.len() as u64;
        let s = scenario(Some("http://t/x"), ReportingProfile::Extended, script);
        let stats = RunStats::default();
        let mut agg = MetricsAggregator::default();

        for _ in 0..n {
            s.run_iteration(&mut agg, &stats).await;
        }

        assert_eq!(agg.total_statuses() + agg.transport_failures(), n);
        assert_eq!(stats.iterations_total(), n);
    }

    #[tokio::test]
    async fn minimal_profile_passes_4xx_check_but_still_counts_failed_request() {
        let s = scenario(Some("http://t/x"), ReportingProfile::Minimal, vec![status(404)]);
        let stats = RunStats::default();
        let mut agg = MetricsAggregator::default();

        s.run_iteration(&mut agg, &stats).await;

        assert!(!agg.has_error_samples());
        let snap = stats.snapshot(Duration::from_secs(1));
        assert_eq!(snap.checks_passed, Some(1));
        assert_eq!(snap.failed_rate, Some(1.0));
    }

    #[tokio::test]
    async fn missing_target_is_a_no_op_iteration() {
        let s = scenario(None, ReportingProfile::Extended, vec![status(200)]);
        let stats = RunStats::default();
        let mut agg = MetricsAggregator::default();

        assert!(s.run_iteration(&mut agg, &stats).await.is_none());
        assert_eq!(stats.requests_total(), 0);
        assert_eq!(stats.iterations_total(), 1);
        assert_eq!(agg.total_statuses(), 0);
    }
}
