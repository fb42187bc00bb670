use clap::{Args, Parser, Subcommand};
use vuprobe_core::ReportingProfile;

fn parse_reporting_profile(input: &str) -> Result<ReportingProfile, String> {
    input
        .trim()
        .parse()
        .map_err(|_| format!("invalid profile '{input}' (expected minimal or extended)"))
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary.
    HumanReadable,
    /// Emit JSON progress lines (NDJSON) and a final summary line to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "vuprobe",
    author,
    version,
    about = "Single-scenario HTTP load test harness",
    long_about = "vuprobe drives one configured HTTP request from a number of virtual users for a named load profile, classifies every response and prints a thresholded summary.\n\nAll scenario inputs come from the environment (MODE, TARGET_URL, HTTP_METHOD, HTTP_HEADERS, HTTP_BODY, ENFORCE_THRESHOLDS, ...); use `--env KEY=VALUE` to add/override values.",
    after_help = "Examples:\n  vuprobe run --env TARGET_URL=https://example.com/health\n  vuprobe run --env MODE=custom --env CUSTOM_VUS=10 --env CUSTOM_DURATION_SECONDS=90\n  vuprobe run --env TARGET_URL=http://localhost:8080 --env ENFORCE_THRESHOLDS=true --output json\n  vuprobe profiles"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the configured scenario
    #[command(
        long_about = "Resolve the load profile from the environment and run the scenario.\n\nThe run always completes and prints a report; only enforced thresholds change the exit code."
    )]
    Run(RunArgs),

    /// List named load profiles and their defaults
    Profiles,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Add/override env vars read by the scenario (repeatable, KEY=VALUE).
    /// CLI-provided vars override the current process env.
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,

    /// Reporting profile (minimal or extended); overrides REPORT_PROFILE
    #[arg(long, value_name = "PROFILE", value_parser = parse_reporting_profile)]
    pub profile: Option<ReportingProfile>,

    /// Stop after this many iterations in total, even before the duration elapses
    #[arg(long)]
    pub iterations: Option<u64>,
}
