use crate::policy::ReportingProfile;

/// Longest error message kept in a sample, in characters.
pub const MAX_MESSAGE_CHARS: usize = 200;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum ErrorBucket {
    Auth,
    Client,
    Server,
}

impl ErrorBucket {
    pub const ALL: [ErrorBucket; 3] = [ErrorBucket::Auth, ErrorBucket::Client, ErrorBucket::Server];

    /// `401`/`403` win over the range checks; `0` is grouped with `5xx`.
    #[must_use]
    pub fn for_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Auth,
            0 => Self::Server,
            s if s >= 500 => Self::Server,
            _ => Self::Client,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSample {
    pub status: u16,
    pub message: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    Success { status: u16 },
    /// The transport never produced a status.
    TransportFailure { message: String },
    ErrorStatus { status: u16, message: String },
}

impl ResponseOutcome {
    /// Classify a returned status under `policy`.
    #[must_use]
    pub fn from_status(status: u16, first_line: Option<&str>, policy: ReportingProfile) -> Self {
        if policy.classifies(status) {
            Self::ErrorStatus {
                status,
                message: status_message(status, first_line),
            }
        } else {
            Self::Success { status }
        }
    }

    #[must_use]
    pub fn transport_failure(message: &str) -> Self {
        Self::TransportFailure {
            message: bounded_message(message),
        }
    }

    /// Status as observed on the wire; `None` for transport failures.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Success { status } | Self::ErrorStatus { status, .. } => Some(*status),
            Self::TransportFailure { .. } => None,
        }
    }

    #[must_use]
    pub fn bucket(&self) -> Option<ErrorBucket> {
        match self {
            Self::Success { .. } => None,
            Self::TransportFailure { .. } => Some(ErrorBucket::Server),
            Self::ErrorStatus { status, .. } => Some(ErrorBucket::for_status(*status)),
        }
    }

    #[must_use]
    pub fn sample(&self, url: &str) -> Option<ErrorSample> {
        match self {
            Self::Success { .. } => None,
            Self::TransportFailure { message } => Some(ErrorSample {
                status: 0,
                message: message.clone(),
                url: url.to_string(),
            }),
            Self::ErrorStatus { status, message } => Some(ErrorSample {
                status: *status,
                message: message.clone(),
                url: url.to_string(),
            }),
        }
    }
}

/// Trim and cap `raw` at [`MAX_MESSAGE_CHARS`], appending `…` when cut.
#[must_use]
pub fn bounded_message(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.chars().count() <= MAX_MESSAGE_CHARS {
        return trimmed.to_string();
    }

    let mut out: String = trimmed.chars().take(MAX_MESSAGE_CHARS - 1).collect();
    out.push('…');
    out
}

/// Prefer the response's first body line, then the canonical reason phrase.
#[must_use]
pub fn status_message(status: u16, first_line: Option<&str>) -> String {
    if let Some(line) = first_line.map(str::trim).filter(|l| !l.is_empty()) {
        return bounded_message(line);
    }

    match http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
    {
        Some(reason) => format!("HTTP {status} {reason}"),
        None => format!("HTTP {status}"),
    }
}
