#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Includes runs whose thresholds were only advisory.
    Success = 0,

    /// One or more enforced thresholds failed.
    ThresholdsFailed = 11,

    /// Invalid CLI input (bad flags, malformed `--env` pairs).
    InvalidInput = 30,

    /// Internal/runtime error; also used when a VU task panicked (the report is still printed).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn from_violations(enforced: bool, violations: usize) -> Self {
        if enforced && violations > 0 {
            Self::ThresholdsFailed
        } else {
            Self::Success
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advisory_violations_do_not_fail_the_run() {
        assert_eq!(ExitCode::from_violations(false, 2), ExitCode::Success);
        assert_eq!(ExitCode::from_violations(true, 0), ExitCode::Success);
        assert_eq!(ExitCode::from_violations(true, 1), ExitCode::ThresholdsFailed);
        assert_eq!(ExitCode::ThresholdsFailed.as_i32(), 11);
    }
}
