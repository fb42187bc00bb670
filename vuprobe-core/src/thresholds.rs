use crate::summary::RunStatistics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdOp {
    Lt,
    Lte,
}

impl ThresholdOp {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }

    #[must_use]
    pub fn passes(self, observed: f64, limit: f64) -> bool {
        match self {
            Self::Lt => observed < limit,
            Self::Lte => observed <= limit,
        }
    }
}

/// Failed-rate and p95 latency limits sharing one comparison operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdSet {
    pub max_failed_rate: f64,
    pub max_p95_latency_ms: f64,
    pub op: ThresholdOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdMetric {
    FailedRate,
    P95Latency,
}

impl ThresholdMetric {
    #[must_use]
    pub fn metric_name(self) -> &'static str {
        match self {
            Self::FailedRate => "http_req_failed",
            Self::P95Latency => "http_req_duration",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdViolation {
    pub metric: ThresholdMetric,
    pub expression: String,
    pub limit: f64,
    /// `None` when the run never produced the statistic.
    pub observed: Option<f64>,
}

impl ThresholdSet {
    /// k6-style expression, e.g. `rate<0.05`.
    #[must_use]
    pub fn expression(&self, metric: ThresholdMetric) -> String {
        match metric {
            ThresholdMetric::FailedRate => format!("rate{}{}", self.op.as_str(), self.max_failed_rate),
            ThresholdMetric::P95Latency => {
                format!("p(95){}{}", self.op.as_str(), self.max_p95_latency_ms)
            }
        }
    }

    #[must_use]
    pub fn limit(&self, metric: ThresholdMetric) -> f64 {
        match metric {
            ThresholdMetric::FailedRate => self.max_failed_rate,
            ThresholdMetric::P95Latency => self.max_p95_latency_ms,
        }
    }

    /// `None` when the observation is missing.
    #[must_use]
    pub fn passes(&self, metric: ThresholdMetric, observed: Option<f64>) -> Option<bool> {
        observed.map(|v| self.op.passes(v, self.limit(metric)))
    }

    /// Missing observations count as violations.
    #[must_use]
    pub fn evaluate(&self, stats: &RunStatistics) -> Vec<ThresholdViolation> {
        [
            (ThresholdMetric::FailedRate, stats.failed_rate),
            (ThresholdMetric::P95Latency, stats.latency.p95),
        ]
        .into_iter()
        .filter(|(metric, observed)| self.passes(*metric, *observed) != Some(true))
        .map(|(metric, observed)| ThresholdViolation {
            metric,
            expression: self.expression(metric),
            limit: self.limit(metric),
            observed,
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::LatencySummary;

    fn stats(failed_rate: Option<f64>, p95: Option<f64>) -> RunStatistics {
        RunStatistics {
            failed_rate,
            latency: LatencySummary {
                p95,
                ..LatencySummary::default()
            },
            ..RunStatistics::default()
        }
    }

    #[test]
    fn strict_thresholds_fail_on_equality() {
        let set = ThresholdSet {
            max_failed_rate: 0.05,
            max_p95_latency_ms: 3500.0,
            op: ThresholdOp::Lt,
        };
        let v = set.evaluate(&stats(Some(0.05), Some(100.0)));
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].metric, ThresholdMetric::FailedRate);
        assert_eq!(v[0].expression, "rate<0.05");
    }

    #[test]
    fn inclusive_thresholds_pass_on_equality() {
        let set = ThresholdSet {
            max_failed_rate: 0.05,
            max_p95_latency_ms: 2200.0,
            op: ThresholdOp::Lte,
        };
        assert!(set.evaluate(&stats(Some(0.05), Some(2200.0))).is_empty());
    }

    #[test]
    fn missing_statistics_are_violations() {
        let set = ThresholdSet {
            max_failed_rate: 0.05,
            max_p95_latency_ms: 2200.0,
            op: ThresholdOp::Lte,
        };
        let v = set.evaluate(&stats(None, None));
        assert_eq!(v.len(), 2);
        assert!(v.iter().all(|v| v.observed.is_none()));
        assert_eq!(v[1].expression, "p(95)<=2200");
    }
}
