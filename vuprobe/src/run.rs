use std::sync::Arc;

use anyhow::Context as _;
use tracing::{debug, info};
use vuprobe_core::runner::{RunOptions, run_scenario};
use vuprobe_core::{EnvVars, HarnessEnv, HttpTransport, Profile, Scenario};
use vuprobe_http::HttpClient;

use crate::cli::RunArgs;
use crate::exit_codes::ExitCode;
use crate::output::{self, RunHeader};
use crate::run_error::RunError;

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let env = merged_env(&args.env).map_err(RunError::InvalidInput)?;

    let mut harness = HarnessEnv::from_env(&env);
    if let Some(profile) = args.profile {
        harness.reporting = profile;
    }
    let config = harness.run_config();
    debug!(?config, "resolved run config");

    let out = output::formatter(args.output);
    let header = RunHeader::new(&config, harness.request.url(), harness.reporting);
    out.print_header(&header);

    let transport = HttpTransport::new(HttpClient::default(), harness.request_timeout);
    let scenario = Arc::new(Scenario::new(
        harness.request.clone(),
        harness.reporting,
        harness.iteration_pause,
        transport,
    ));

    let opts = RunOptions {
        iterations: args.iterations,
        progress: out.progress(),
    };

    let outcome = run_scenario(&config, scenario, opts, ctrl_c())
        .await
        .map_err(classify_core_error)?;

    out.print_summary(&header, &outcome)
        .context("failed to print summary")
        .map_err(RunError::RuntimeError)?;

    if outcome.failed_vus > 0 {
        eprintln!(
            "{} virtual user(s) failed; the report covers the remaining ones",
            outcome.failed_vus
        );
        return Ok(ExitCode::RuntimeError);
    }

    let code = ExitCode::from_violations(header.enforced, outcome.violations.len());
    info!(exit_code = code.as_i32(), "run finished");
    Ok(code)
}

pub fn profiles() -> ExitCode {
    println!("{:<8} {:>6}  DURATION", "MODE", "VUS");
    for p in Profile::ALL {
        println!(
            "{:<8} {:>6}  {}",
            p.to_string(),
            p.default_vus(),
            p.default_duration()
        );
    }
    ExitCode::Success
}

fn classify_core_error(err: vuprobe_core::Error) -> RunError {
    match err {
        vuprobe_core::Error::InvalidVus | vuprobe_core::Error::InvalidIterations => {
            RunError::InvalidInput(anyhow::Error::new(err))
        }
    }
}

async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler; the run ends on its own.
        std::future::pending::<()>().await;
    }
}

/// Process env with `--env` pairs appended; lookups take the last entry for a key.
pub(crate) fn merged_env(overrides: &[String]) -> anyhow::Result<EnvVars> {
    let mut vars: Vec<(Arc<str>, Arc<str>)> = vuprobe_core::process_env_snapshot().to_vec();

    for raw in overrides {
        let (k, v) = parse_env_override(raw)?;
        vars.push((Arc::<str>::from(k), Arc::<str>::from(v)));
    }

    Ok(Arc::from(vars.into_boxed_slice()))
}

fn parse_env_override(s: &str) -> anyhow::Result<(String, String)> {
    let (k, v) = s
        .split_once('=')
        .with_context(|| format!("invalid --env (expected KEY=VALUE): {s}"))?;
    if k.is_empty() {
        anyhow::bail!("invalid --env (empty KEY): {s}");
    }
    Ok((k.to_string(), v.to_string()))
}
