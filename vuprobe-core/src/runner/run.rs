use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Barrier;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::aggregator::MetricsAggregator;
use crate::profile::{MAX_VUS, RunConfig};
use crate::scenario::Scenario;
use crate::summary::RunStatistics;
use crate::thresholds::ThresholdViolation;
use crate::transport::Transport;

use super::gate::IterationGate;
use super::progress::{ProgressFn, ProgressUpdate};
use super::stats::RunStats;
use crate::error::{Error, Result};

#[derive(Clone, Default)]
pub struct RunOptions {
    /// Stop after this many iterations across all VUs, even before the deadline.
    pub iterations: Option<u64>,
    pub progress: Option<ProgressFn>,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub aggregator: MetricsAggregator,
    pub statistics: RunStatistics,
    /// Empty unless the config carried thresholds.
    pub violations: Vec<ThresholdViolation>,
    pub elapsed: Duration,
    /// VU tasks that panicked; their iterations are missing from `aggregator`.
    pub failed_vus: u64,
}

/// Drive `config.vus` virtual users against `scenario` until the duration elapses,
/// the iteration cap is reached or `stop` resolves.
pub async fn run_scenario<T, S>(
    config: &RunConfig,
    scenario: Arc<Scenario<T>>,
    opts: RunOptions,
    stop: S,
) -> Result<RunOutcome>
where
    T: Transport,
    S: Future<Output = ()> + Send + 'static,
{
    if config.vus == 0 || config.vus > MAX_VUS {
        return Err(Error::InvalidVus);
    }
    if opts.iterations == Some(0) {
        return Err(Error::InvalidIterations);
    }

    let vus = usize::try_from(config.vus).map_err(|_| Error::InvalidVus)?;
    let duration = config.duration.as_duration();

    let stats = Arc::new(RunStats::default());
    let gate = Arc::new(IterationGate::new(duration, opts.iterations));
    let ready: Arc<Barrier> = Arc::new(Barrier::new(vus.saturating_add(1)));

    info!(
        profile = %config.profile,
        vus = config.vus,
        duration = %config.duration,
        target = scenario.request().url().unwrap_or("(none)"),
        "starting run"
    );

    let mut handles = Vec::new();
    for vu_id in 1..=config.vus {
        let scenario = scenario.clone();
        let stats = stats.clone();
        let gate = gate.clone();
        let ready = ready.clone();
        handles.push(tokio::spawn(async move {
            let _active = stats.enter_vu();
            let mut agg = MetricsAggregator::default();

            // Keep spawning out of the measured window.
            ready.wait().await;

            while gate.next() {
                scenario.run_iteration(&mut agg, &stats).await;
            }

            debug!(vu_id, "vu finished");
            agg
        }));
    }

    ready.wait().await;
    let started = Instant::now();
    gate.start_at(started);

    let stopper = {
        let gate = gate.clone();
        tokio::spawn(async move {
            stop.await;
            info!("stop requested; finishing in-flight iterations");
            gate.close();
        })
    };

    let progress_handle = opts.progress.as_ref().map(|progress| {
        let progress = progress.clone();
        let stats = stats.clone();
        let vus = config.vus;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;

            let mut tick: u64 = 0;
            let mut last_at = Instant::now();
            let mut last_requests = stats.requests_total();

            loop {
                interval.tick().await;
                tick = tick.saturating_add(1);

                let now = Instant::now();
                let dt = now.duration_since(last_at).as_secs_f64();
                let requests = stats.requests_total();
                let rps_now = if dt > 0.0 {
                    requests.saturating_sub(last_requests) as f64 / dt
                } else {
                    0.0
                };
                last_at = now;
                last_requests = requests;

                (progress)(ProgressUpdate {
                    tick,
                    elapsed: started.elapsed(),
                    duration,
                    vus,
                    vus_active: stats.vus_active(),
                    requests_total: requests,
                    failed_requests_total: stats.failed_requests_total(),
                    iterations_total: stats.iterations_total(),
                    rps_now,
                });
            }
        })
    });

    let mut aggregator = MetricsAggregator::default();
    let mut failed_vus: u64 = 0;
    for h in handles {
        match h.await {
            Ok(agg) => aggregator.merge(agg),
            Err(err) => {
                error!(error = %err, "vu task failed; reporting the remaining vus");
                failed_vus += 1;
            }
        }
    }

    stopper.abort();
    if let Some(h) = progress_handle {
        h.abort();
        let _ = h.await;
    }

    let elapsed = started.elapsed();
    let statistics = stats.snapshot(elapsed);
    let violations = config
        .thresholds
        .map(|t| t.evaluate(&statistics))
        .unwrap_or_default();

    info!(
        requests = stats.requests_total(),
        iterations = stats.iterations_total(),
        elapsed_ms = elapsed.as_millis() as u64,
        violations = violations.len(),
        failed_vus,
        "run finished"
    );

    Ok(RunOutcome {
        aggregator,
        statistics,
        violations,
        elapsed,
        failed_vus,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ReportingProfile;
    use crate::profile::{Profile, RunDuration};
    use crate::request::{HttpMethod, RequestDescriptor};
    use crate::transport::{TransportError, TransportResponse};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Panics on the first send, answers 200 afterwards.
    #[derive(Default)]
    struct PanicsOnce {
        calls: AtomicU64,
    }

    impl Transport for PanicsOnce {
        async fn send(
            &self,
            _req: &RequestDescriptor,
            _url: &str,
        ) -> std::result::Result<TransportResponse, TransportError> {
            if self.calls.fetch_add(1, Ordering::Relaxed) == 0 {
                panic!("transport blew up");
            }
            Ok(TransportResponse {
                status: 200,
                message: None,
                bytes_sent: 1,
                bytes_received: 1,
            })
        }
    }

    fn config(vus: u64) -> RunConfig {
        let Some(duration) = RunDuration::from_secs(30) else {
            panic!("non-zero duration");
        };
        RunConfig {
            profile: Profile::Custom,
            vus,
            duration,
            thresholds: None,
        }
    }

    fn scenario() -> Arc<Scenario<PanicsOnce>> {
        let request = RequestDescriptor::new(
            HttpMethod::Get,
            Some("http://target/ok".to_string()),
            BTreeMap::new(),
            None,
        );
        Arc::new(Scenario::new(
            request,
            ReportingProfile::Extended,
            Duration::ZERO,
            PanicsOnce::default(),
        ))
    }

    #[tokio::test]
    async fn oversized_vus_are_rejected_before_spawning() {
        let res = run_scenario(
            &config(u64::MAX),
            scenario(),
            RunOptions::default(),
            std::future::pending(),
        )
        .await;
        assert!(matches!(res, Err(Error::InvalidVus)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn panicked_vu_still_yields_a_report() {
        let opts = RunOptions {
            iterations: Some(4),
            progress: None,
        };
        let outcome = match run_scenario(&config(2), scenario(), opts, std::future::pending()).await
        {
            Ok(v) => v,
            Err(err) => panic!("run failed: {err}"),
        };

        assert_eq!(outcome.failed_vus, 1);
        // One admitted iteration died with its VU; the survivor ran the rest.
        assert_eq!(outcome.aggregator.status_count(200), 3);
        assert_eq!(outcome.statistics.vus_max, Some(2));
    }
}
