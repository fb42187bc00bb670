use std::sync::Arc;

mod format;
mod progress;
mod summary;

use format::{format_elapsed, format_rate};
use progress::HumanProgress;
use summary::render;
use vuprobe_core::runner::{ProgressFn, ProgressUpdate, RunOutcome};

use super::{OutputFormatter, RunHeader};

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: Arc::new(HumanProgress::new()),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, header: &RunHeader) {
        println!(
            "running: mode={} vus={} duration={} target={}",
            header.profile,
            header.vus,
            header.duration,
            header.target.as_deref().unwrap_or("(none)")
        );
        println!();
    }

    fn progress(&self) -> Option<ProgressFn> {
        let progress = self.progress.clone();
        Some(Arc::new(move |u: ProgressUpdate| {
            let message = format!(
                "vus={}/{} elapsed={} rps={} requests={} failed={} iterations={}",
                u.vus_active,
                u.vus,
                format_elapsed(u.elapsed),
                format_rate(u.rps_now),
                u.requests_total,
                u.failed_requests_total,
                u.iterations_total
            );
            progress.update(u.duration, u.elapsed, message);
        }))
    }

    fn print_summary(&self, header: &RunHeader, outcome: &RunOutcome) -> anyhow::Result<()> {
        self.progress.finish();
        print!("{}", render(header, &outcome.aggregator, &outcome.statistics));

        if header.enforced && !outcome.violations.is_empty() {
            eprintln!("thresholds failed:");
            for v in &outcome.violations {
                match v.observed {
                    Some(obs) => eprintln!(
                        "  {}: {} (observed {obs})",
                        v.metric.metric_name(),
                        v.expression
                    ),
                    None => eprintln!(
                        "  {}: {} (no data)",
                        v.metric.metric_name(),
                        v.expression
                    ),
                }
            }
        }

        Ok(())
    }
}
