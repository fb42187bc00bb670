use std::fmt;
use std::time::Duration;

use tracing::warn;

use crate::policy::ReportingProfile;
use crate::thresholds::ThresholdSet;

/// Upper bound for a CUSTOM VU override; larger values are clamped.
pub const MAX_VUS: u64 = 100_000;

/// Upper bound (7 days) for a CUSTOM duration override; larger values are clamped.
pub const MAX_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Named load profile. Parsing ignores ASCII case.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::EnumString, strum::Display,
)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum Profile {
    #[default]
    Smoke,
    Stress,
    Soak,
    Spike,
    Custom,
}

impl Profile {
    pub const ALL: [Profile; 5] = [
        Profile::Smoke,
        Profile::Stress,
        Profile::Soak,
        Profile::Spike,
        Profile::Custom,
    ];

    /// Unknown or empty names fall back to [`Profile::Smoke`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        name.trim().parse().unwrap_or_default()
    }

    #[must_use]
    pub fn default_vus(self) -> u64 {
        match self {
            Self::Smoke => 1,
            Self::Stress => 50,
            Self::Soak => 20,
            Self::Spike => 200,
            Self::Custom => 5,
        }
    }

    #[must_use]
    pub fn default_duration(self) -> RunDuration {
        let secs = match self {
            Self::Smoke => 30,
            Self::Stress => 5 * 60,
            Self::Soak => 30 * 60,
            Self::Spike => 60,
            Self::Custom => 60,
        };
        RunDuration(secs)
    }
}

/// Whole-second run duration. Displays as `2m5s`, `1m` or `45s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunDuration(u64);

impl RunDuration {
    /// Returns `None` for zero; a run always lasts at least one second.
    #[must_use]
    pub fn from_secs(secs: u64) -> Option<Self> {
        (secs > 0).then_some(Self(secs))
    }

    #[must_use]
    pub fn as_secs(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn as_duration(self) -> Duration {
        Duration::from_secs(self.0)
    }
}

impl fmt::Display for RunDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minutes = self.0 / 60;
        let seconds = self.0 % 60;
        match (minutes, seconds) {
            (0, s) => write!(f, "{s}s"),
            (m, 0) => write!(f, "{m}m"),
            (m, s) => write!(f, "{m}m{s}s"),
        }
    }
}

/// Raw numeric overrides, only honoured for [`Profile::Custom`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Overrides {
    pub vus: Option<f64>,
    pub duration_seconds: Option<f64>,
}

impl Overrides {
    /// Lenient parse: anything that is not a number is treated as absent.
    #[must_use]
    pub fn parse(vus: Option<&str>, duration_seconds: Option<&str>) -> Self {
        let num = |raw: Option<&str>| raw.and_then(|s| s.trim().parse::<f64>().ok());
        Self {
            vus: num(vus),
            duration_seconds: num(duration_seconds),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub profile: Profile,
    pub vus: u64,
    pub duration: RunDuration,
    /// Present only when thresholds are enforced; a violation then fails the run.
    pub thresholds: Option<ThresholdSet>,
}

/// Resolve a mode name and optional overrides into a concrete run shape.
///
/// Never fails: invalid overrides are ignored and unknown modes resolve to SMOKE.
#[must_use]
pub fn resolve(
    mode_name: &str,
    overrides: Overrides,
    enforce_thresholds: bool,
    reporting: ReportingProfile,
) -> RunConfig {
    let profile = Profile::from_name(mode_name);

    let mut vus = profile.default_vus();
    let mut duration = profile.default_duration();

    if profile == Profile::Custom {
        if let Some(v) = positive_rounded(overrides.vus, MAX_VUS) {
            vus = v;
        }
        if let Some(d) = positive_rounded(overrides.duration_seconds, MAX_DURATION_SECS)
            .and_then(RunDuration::from_secs)
        {
            duration = d;
        }
    }

    RunConfig {
        profile,
        vus,
        duration,
        thresholds: enforce_thresholds.then(|| reporting.enforced_thresholds()),
    }
}

fn positive_rounded(value: Option<f64>, max: u64) -> Option<u64> {
    let v = value.filter(|v| v.is_finite() && *v > 0.0)?.round();
    // Values like 0.4 are positive but round to nothing usable.
    if v < 1.0 {
        return None;
    }
    if v > max as f64 {
        warn!(value = v, max, "override too large; clamping");
        return Some(max);
    }
    Some(v as u64)
}
