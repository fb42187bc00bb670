use crate::thresholds::{ThresholdOp, ThresholdSet};

/// How strictly responses are judged and which thresholds apply.
///
/// - `Minimal`: only `0` and `5xx` count as errors; the status check passes below 500.
/// - `Extended`: every `0`/`4xx`/`5xx` is classified; the status check passes below 400.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::EnumString, strum::Display,
)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum ReportingProfile {
    Minimal,
    #[default]
    Extended,
}

pub const MAX_FAILED_RATE: f64 = 0.05;
pub const ADVISORY_P95_LATENCY_MS: f64 = 2200.0;

impl ReportingProfile {
    /// Unknown names fall back to `Extended`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        name.trim().parse().unwrap_or_default()
    }

    /// Exclusive upper bound for the "status ok" check.
    #[must_use]
    pub fn ok_below(self) -> u16 {
        match self {
            Self::Minimal => 500,
            Self::Extended => 400,
        }
    }

    #[must_use]
    pub fn status_ok(self, status: u16) -> bool {
        status != 0 && status < self.ok_below()
    }

    /// Whether a returned status is recorded as an error sample.
    #[must_use]
    pub fn classifies(self, status: u16) -> bool {
        !self.status_ok(status)
    }

    /// Thresholds attached to the run config when enforcement is on.
    #[must_use]
    pub fn enforced_thresholds(self) -> ThresholdSet {
        let p95 = match self {
            Self::Minimal => ADVISORY_P95_LATENCY_MS,
            Self::Extended => 3500.0,
        };
        ThresholdSet {
            max_failed_rate: MAX_FAILED_RATE,
            max_p95_latency_ms: p95,
            op: ThresholdOp::Lt,
        }
    }

    /// Thresholds the reporter re-checks when nothing is enforced.
    #[must_use]
    pub fn advisory_thresholds(self) -> ThresholdSet {
        ThresholdSet {
            max_failed_rate: MAX_FAILED_RATE,
            max_p95_latency_ms: ADVISORY_P95_LATENCY_MS,
            op: ThresholdOp::Lte,
        }
    }
}

/// A request counts towards the failed-request rate regardless of reporting profile.
#[must_use]
pub fn request_failed(status: u16) -> bool {
    status == 0 || status >= 400
}
