#![forbid(unsafe_code)]

mod aggregator;
mod classify;
mod env;
mod error;
mod policy;
mod profile;
mod request;
mod scenario;
mod summary;
mod thresholds;
mod transport;

pub mod runner;

pub use aggregator::{MAX_SAMPLES_PER_BUCKET, MetricsAggregator};
pub use classify::{
    ErrorBucket, ErrorSample, MAX_MESSAGE_CHARS, ResponseOutcome, bounded_message, status_message,
};
pub use env::{
    DEFAULT_ITERATION_PAUSE, DEFAULT_REQUEST_TIMEOUT, EnvVars, HarnessEnv, lookup,
    process_env_snapshot,
};
pub use error::{Error, Result};
pub use policy::{ADVISORY_P95_LATENCY_MS, MAX_FAILED_RATE, ReportingProfile, request_failed};
pub use profile::{
    MAX_DURATION_SECS, MAX_VUS, Overrides, Profile, RunConfig, RunDuration, resolve,
};
pub use request::{HttpMethod, RequestDescriptor, parse_headers};
pub use scenario::Scenario;
pub use summary::{LatencySummary, RunStatistics};
pub use thresholds::{ThresholdMetric, ThresholdOp, ThresholdSet, ThresholdViolation};
pub use transport::{HttpTransport, Transport, TransportError, TransportResponse};
