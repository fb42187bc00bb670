use crate::cli::OutputFormat;
use vuprobe_core::runner::{ProgressFn, RunOutcome};
use vuprobe_core::{Profile, ReportingProfile, RunConfig, RunDuration, ThresholdSet};

mod human;
mod json;

/// What the run was asked to do, shown above the results.
#[derive(Debug, Clone)]
pub(crate) struct RunHeader {
    pub profile: Profile,
    pub vus: u64,
    pub duration: RunDuration,
    pub target: Option<String>,
    pub reporting: ReportingProfile,
    /// Limits used for coloring and advisory warnings.
    pub thresholds: ThresholdSet,
    pub enforced: bool,
}

impl RunHeader {
    pub(crate) fn new(
        config: &RunConfig,
        target: Option<&str>,
        reporting: ReportingProfile,
    ) -> Self {
        Self {
            profile: config.profile,
            vus: config.vus,
            duration: config.duration,
            target: target.map(str::to_string),
            reporting,
            thresholds: config
                .thresholds
                .unwrap_or_else(|| reporting.advisory_thresholds()),
            enforced: config.thresholds.is_some(),
        }
    }
}

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, header: &RunHeader);
    fn progress(&self) -> Option<ProgressFn>;
    fn print_summary(&self, header: &RunHeader, outcome: &RunOutcome) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new()),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
