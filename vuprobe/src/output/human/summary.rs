use std::fmt::Write as _;

use console::style;
use vuprobe_core::{
    ErrorBucket, ErrorSample, MetricsAggregator, RunStatistics, ThresholdMetric, ThresholdSet,
};

use super::format::*;
use crate::output::RunHeader;

/// Distinct status codes listed in the status section.
const TOP_STATUSES: usize = 5;

pub(crate) const NO_SAMPLES_NOTE: &str =
    "note: failures detected but no samples captured (possible connectivity/auth issue)";

/// Render the end-of-run report. Missing statistics render as `n/a`.
pub(crate) fn render(
    header: &RunHeader,
    agg: &MetricsAggregator,
    stats: &RunStatistics,
) -> String {
    let mut out = String::new();
    let limits = header.thresholds;

    render_header(header, &mut out);
    render_errors(agg, stats, &limits, &mut out);
    render_latency(stats, &limits, &mut out);
    render_checks(stats, &mut out);
    render_throughput(stats, &mut out);
    render_resources(stats, &mut out);
    render_statuses(agg, &mut out);

    if !header.enforced {
        render_advisory_warnings(stats, &limits, &mut out);
    }

    out
}

fn render_header(h: &RunHeader, out: &mut String) {
    out.push_str("vuprobe summary\n");
    writeln!(out, "  mode: {}", h.profile).ok();
    writeln!(out, "  vus: {}", h.vus).ok();
    writeln!(out, "  duration: {}", h.duration).ok();
    writeln!(out, "  target: {}", h.target.as_deref().unwrap_or("(none)")).ok();
    writeln!(
        out,
        "  profile: {} (thresholds {})",
        h.reporting,
        if h.enforced { "enforced" } else { "advisory" }
    )
    .ok();
    out.push('\n');
}

fn render_errors(
    agg: &MetricsAggregator,
    stats: &RunStatistics,
    limits: &ThresholdSet,
    out: &mut String,
) {
    out.push_str("Errors\n");
    writeln!(
        out,
        "  requests: {} ({})",
        format_count_opt(stats.requests_total),
        format_per_sec_opt(stats.requests_per_sec)
    )
    .ok();

    let failed = flag(
        format_pct_opt(stats.failed_rate),
        limits.passes(ThresholdMetric::FailedRate, stats.failed_rate),
    );
    writeln!(out, "  failed rate: {failed}").ok();
    writeln!(out, "  success rate: {}", format_pct_opt(stats.success_rate())).ok();

    for bucket in ErrorBucket::ALL {
        let first = agg
            .samples(bucket)
            .first()
            .map_or_else(|| "none".to_string(), format_sample);
        writeln!(
            out,
            "  {bucket} errors: {} (first: {first})",
            agg.error_count(bucket)
        )
        .ok();
    }

    if stats.failed_rate.is_some_and(|r| r > 0.0) && !agg.has_error_samples() {
        writeln!(out, "  {NO_SAMPLES_NOTE}").ok();
    }
    out.push('\n');
}

fn format_sample(s: &ErrorSample) -> String {
    format!("[{}] {} @ {}", s.status, s.message, s.url)
}

fn render_latency(stats: &RunStatistics, limits: &ThresholdSet, out: &mut String) {
    out.push_str("Latency\n");
    let l = &stats.latency;
    let rows = [
        ("p95", l.p95),
        ("p99", l.p99),
        ("p75", l.p75),
        ("avg", l.avg),
        ("min", l.min),
        ("max", l.max),
        ("p50", l.p50),
        ("p90", l.p90),
    ];
    for (name, value) in rows {
        // Every row is judged against the p95 limit.
        let ok = limits.passes(ThresholdMetric::P95Latency, value);
        writeln!(out, "  {name}: {}", flag(format_ms_opt(value), ok)).ok();
    }
    out.push('\n');
}

fn render_checks(stats: &RunStatistics, out: &mut String) {
    out.push_str("Checks\n");
    writeln!(out, "  passed: {}", format_count_opt(stats.checks_passed)).ok();
    writeln!(out, "  failed: {}", format_count_opt(stats.checks_failed)).ok();
    out.push('\n');
}

fn render_throughput(stats: &RunStatistics, out: &mut String) {
    out.push_str("Throughput\n");
    writeln!(
        out,
        "  iterations: {} ({})",
        format_count_opt(stats.iterations_total),
        format_per_sec_opt(stats.iterations_per_sec)
    )
    .ok();
    writeln!(out, "  data received: {}", format_bytes_opt(stats.bytes_received)).ok();
    writeln!(out, "  data sent: {}", format_bytes_opt(stats.bytes_sent)).ok();
    out.push('\n');
}

fn render_resources(stats: &RunStatistics, out: &mut String) {
    out.push_str("Resources\n");
    writeln!(out, "  vus: {}", format_count_opt(stats.vus_current)).ok();
    writeln!(out, "  vus max: {}", format_count_opt(stats.vus_max)).ok();
    out.push('\n');
}

fn render_statuses(agg: &MetricsAggregator, out: &mut String) {
    out.push_str("Status codes\n");
    writeln!(
        out,
        "  min: {}  max: {}  median: {}  p90: {}  p99: {}",
        format_count_opt(agg.min_status()),
        format_count_opt(agg.max_status()),
        format_count_opt(agg.status_percentile(50.0)),
        format_count_opt(agg.status_percentile(90.0)),
        format_count_opt(agg.status_percentile(99.0)),
    )
    .ok();

    let top = agg.top_statuses(TOP_STATUSES);
    if top.is_empty() {
        out.push_str("  top: none\n");
    } else {
        let joined = top
            .iter()
            .map(|(status, count)| format!("{status} x{count}"))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(out, "  top: {joined}").ok();
    }

    let buckets = ErrorBucket::ALL
        .iter()
        .map(|b| format!("{b}={}", agg.error_count(*b)))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(out, "  buckets: {buckets}").ok();
}

fn render_advisory_warnings(stats: &RunStatistics, limits: &ThresholdSet, out: &mut String) {
    let observed = [
        (ThresholdMetric::FailedRate, stats.failed_rate),
        (ThresholdMetric::P95Latency, stats.latency.p95),
    ];

    let mut first = true;
    for (metric, value) in observed {
        if limits.passes(metric, value) != Some(false) {
            continue;
        }
        if first {
            out.push('\n');
            first = false;
        }
        let shown = match metric {
            ThresholdMetric::FailedRate => format_pct_opt(value),
            ThresholdMetric::P95Latency => format_ms_opt(value),
        };
        let line = format!(
            "WARN threshold {} {} not met (observed {shown})",
            metric.metric_name(),
            limits.expression(metric)
        );
        writeln!(out, "{}", style(line).yellow()).ok();
    }
}

/// Green within the limit, red outside it, plain when there is nothing to judge.
fn flag(text: String, ok: Option<bool>) -> String {
    match ok {
        Some(true) => style(text).green().to_string(),
        Some(false) => style(text).red().to_string(),
        None => text,
    }
}
