use serde::Serialize;
use std::io::Write as _;
use std::sync::Arc;

use vuprobe_core::runner::{ProgressFn, ProgressUpdate, RunOutcome};
use vuprobe_core::{ErrorBucket, ErrorSample, MetricsAggregator, RunStatistics};

use super::{OutputFormatter, RunHeader};

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _header: &RunHeader) {}

    fn progress(&self) -> Option<ProgressFn> {
        Some(Arc::new(move |u: ProgressUpdate| {
            let line = build_progress_line(&u);
            emit_json_line(&line);
        }))
    }

    fn print_summary(&self, header: &RunHeader, outcome: &RunOutcome) -> anyhow::Result<()> {
        let line = build_summary_line(header, outcome);
        emit_json_line(&line);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonProgressLine {
    pub kind: &'static str,
    pub tick: u64,
    pub elapsed_secs: u64,
    pub duration_secs: u64,
    pub vus: u64,
    pub vus_active: u64,
    pub requests_per_sec: f64,
    pub total_requests: u64,
    pub failed_requests: u64,
    pub iterations: u64,
}

fn build_progress_line(u: &ProgressUpdate) -> JsonProgressLine {
    JsonProgressLine {
        kind: "progress",
        tick: u.tick,
        elapsed_secs: u.elapsed.as_secs(),
        duration_secs: u.duration.as_secs(),
        vus: u.vus,
        vus_active: u.vus_active,
        requests_per_sec: if u.rps_now.is_finite() { u.rps_now } else { 0.0 },
        total_requests: u.requests_total,
        failed_requests: u.failed_requests_total,
        iterations: u.iterations_total,
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub mode: String,
    pub vus: u64,
    pub duration: String,
    pub target: Option<String>,
    pub profile: String,
    pub thresholds_enforced: bool,
    pub elapsed_ms: u64,
    pub failed_vus: u64,
    pub statistics: JsonStatistics,
    pub status_codes: Vec<JsonStatusCount>,
    pub errors: Vec<JsonBucket>,
    pub threshold_violations: Vec<JsonViolation>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonStatistics {
    pub requests_total: Option<u64>,
    pub requests_per_sec: Option<f64>,
    pub failed_rate: Option<f64>,
    pub latency_ms: JsonLatency,
    pub iterations_total: Option<u64>,
    pub iterations_per_sec: Option<f64>,
    pub bytes_sent: Option<u64>,
    pub bytes_received: Option<u64>,
    pub vus: Option<u64>,
    pub vus_max: Option<u64>,
    pub checks_passed: Option<u64>,
    pub checks_failed: Option<u64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonLatency {
    pub avg: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub p90: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonStatusCount {
    pub status: u16,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonBucket {
    pub bucket: String,
    pub count: u64,
    pub samples: Vec<JsonSample>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSample {
    pub status: u16,
    pub message: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonViolation {
    pub metric: &'static str,
    pub expression: String,
    pub observed: Option<f64>,
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|v| v.is_finite())
}

fn build_statistics(s: &RunStatistics) -> JsonStatistics {
    let l = &s.latency;
    JsonStatistics {
        requests_total: s.requests_total,
        requests_per_sec: finite(s.requests_per_sec),
        failed_rate: finite(s.failed_rate),
        latency_ms: JsonLatency {
            avg: finite(l.avg),
            min: finite(l.min),
            max: finite(l.max),
            p50: finite(l.p50),
            p75: finite(l.p75),
            p90: finite(l.p90),
            p95: finite(l.p95),
            p99: finite(l.p99),
        },
        iterations_total: s.iterations_total,
        iterations_per_sec: finite(s.iterations_per_sec),
        bytes_sent: s.bytes_sent,
        bytes_received: s.bytes_received,
        vus: s.vus_current,
        vus_max: s.vus_max,
        checks_passed: s.checks_passed,
        checks_failed: s.checks_failed,
    }
}

fn build_buckets(agg: &MetricsAggregator) -> Vec<JsonBucket> {
    let sample = |s: &ErrorSample| JsonSample {
        status: s.status,
        message: s.message.clone(),
        url: s.url.clone(),
    };

    ErrorBucket::ALL
        .iter()
        .map(|b| JsonBucket {
            bucket: b.to_string(),
            count: agg.error_count(*b),
            samples: agg.samples(*b).iter().map(sample).collect(),
        })
        .collect()
}

fn build_summary_line(header: &RunHeader, outcome: &RunOutcome) -> JsonSummaryLine {
    let agg = &outcome.aggregator;
    JsonSummaryLine {
        kind: "summary",
        mode: header.profile.to_string(),
        vus: header.vus,
        duration: header.duration.to_string(),
        target: header.target.clone(),
        profile: header.reporting.to_string(),
        thresholds_enforced: header.enforced,
        elapsed_ms: outcome.elapsed.as_millis() as u64,
        failed_vus: outcome.failed_vus,
        statistics: build_statistics(&outcome.statistics),
        status_codes: agg
            .status_order()
            .iter()
            .map(|s| JsonStatusCount {
                status: *s,
                count: agg.status_count(*s),
            })
            .collect(),
        errors: build_buckets(agg),
        threshold_violations: outcome
            .violations
            .iter()
            .map(|v| JsonViolation {
                metric: v.metric.metric_name(),
                expression: v.expression.clone(),
                observed: finite(v.observed),
            })
            .collect(),
    }
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vuprobe_core::{Profile, ReportingProfile, ResponseOutcome};

    #[test]
    fn summary_line_carries_buckets_and_statuses() {
        let mut aggregator = MetricsAggregator::default();
        aggregator.record(
            &ResponseOutcome::from_status(401, None, ReportingProfile::Extended),
            "http://t/x",
        );
        aggregator.record(&ResponseOutcome::transport_failure("refused"), "http://t/x");

        let header = RunHeader {
            profile: Profile::Custom,
            vus: 2,
            duration: Profile::Custom.default_duration(),
            target: Some("http://t/x".to_string()),
            reporting: ReportingProfile::Extended,
            thresholds: ReportingProfile::Extended.advisory_thresholds(),
            enforced: false,
        };
        let outcome = RunOutcome {
            aggregator,
            statistics: RunStatistics::default(),
            violations: Vec::new(),
            elapsed: Duration::from_millis(1500),
            failed_vus: 0,
        };

        let value = match serde_json::to_value(build_summary_line(&header, &outcome)) {
            Ok(v) => v,
            Err(err) => panic!("serialize failed: {err}"),
        };

        assert_eq!(value["kind"], "summary");
        assert_eq!(value["mode"], "CUSTOM");
        assert_eq!(value["duration"], "1m");
        assert_eq!(value["status_codes"][0]["status"], 401);
        assert_eq!(value["errors"][0]["bucket"], "auth");
        assert_eq!(value["errors"][0]["count"], 1);
        assert_eq!(value["errors"][2]["samples"][0]["status"], 0);
        assert!(value["statistics"]["failed_rate"].is_null());
    }
}
