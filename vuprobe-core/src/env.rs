use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::policy::ReportingProfile;
use crate::profile::{Overrides, RunConfig, resolve};
use crate::request::RequestDescriptor;

pub type EnvVars = Arc<[(Arc<str>, Arc<str>)]>;

pub const DEFAULT_ITERATION_PAUSE: Duration = Duration::from_millis(1000);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(30_000);

pub fn process_env_snapshot() -> EnvVars {
    let vars: Vec<(Arc<str>, Arc<str>)> = std::env::vars()
        .map(|(k, v)| (Arc::<str>::from(k), Arc::<str>::from(v)))
        .collect();
    Arc::from(vars.into_boxed_slice())
}

/// Last non-blank value for `key`; later entries win so overlays can be appended.
#[must_use]
pub fn lookup<'a>(env: &'a [(Arc<str>, Arc<str>)], key: &str) -> Option<&'a str> {
    env.iter()
        .rev()
        .find(|(k, _)| k.as_ref() == key)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}

/// Like [`lookup`] but keeps surrounding whitespace.
#[must_use]
pub fn lookup_verbatim<'a>(env: &'a [(Arc<str>, Arc<str>)], key: &str) -> Option<&'a str> {
    env.iter()
        .rev()
        .find(|(k, _)| k.as_ref() == key)
        .map(|(_, v)| v.as_ref())
        .filter(|v| !v.is_empty())
}

/// Typed view of every input the harness reads from its environment.
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessEnv {
    pub mode: String,
    pub overrides: Overrides,
    pub enforce_thresholds: bool,
    pub reporting: ReportingProfile,
    pub request: RequestDescriptor,
    pub iteration_pause: Duration,
    pub request_timeout: Duration,
}

impl HarnessEnv {
    #[must_use]
    pub fn from_env(env: &[(Arc<str>, Arc<str>)]) -> Self {
        let get = |key: &str| lookup(env, key);

        let url = get("TARGET_URL").or_else(|| get("API_BASE_URL"));
        let request = RequestDescriptor::from_raw(
            get("HTTP_METHOD"),
            url,
            get("HTTP_HEADERS"),
            lookup_verbatim(env, "HTTP_BODY"),
        );

        let iteration_pause = millis(get("ITERATION_PAUSE_MS"), "ITERATION_PAUSE_MS", true)
            .unwrap_or(DEFAULT_ITERATION_PAUSE);
        let request_timeout = millis(get("REQUEST_TIMEOUT_MS"), "REQUEST_TIMEOUT_MS", false)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        Self {
            mode: get("MODE").unwrap_or_default().to_string(),
            overrides: Overrides::parse(get("CUSTOM_VUS"), get("CUSTOM_DURATION_SECONDS")),
            enforce_thresholds: get("ENFORCE_THRESHOLDS").is_some_and(truthy),
            reporting: get("REPORT_PROFILE")
                .map(ReportingProfile::from_name)
                .unwrap_or_default(),
            request,
            iteration_pause,
            request_timeout,
        }
    }

    #[must_use]
    pub fn run_config(&self) -> RunConfig {
        resolve(
            &self.mode,
            self.overrides,
            self.enforce_thresholds,
            self.reporting,
        )
    }
}

fn truthy(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("true") || raw == "1"
}

fn millis(raw: Option<&str>, key: &str, allow_zero: bool) -> Option<Duration> {
    let raw = raw?;
    match raw.parse::<u64>() {
        Ok(ms) if ms > 0 || allow_zero => Some(Duration::from_millis(ms)),
        _ => {
            warn!(key, value = raw, "invalid millisecond value; using default");
            None
        }
    }
}
