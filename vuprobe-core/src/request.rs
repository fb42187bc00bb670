use std::collections::BTreeMap;

use tracing::warn;

/// Verbs the harness can issue. Parsing ignores ASCII case.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::EnumString, strum::Display,
)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    #[must_use]
    pub fn allows_body(self) -> bool {
        !matches!(self, Self::Get | Self::Head)
    }

    #[must_use]
    pub fn as_http(self) -> http::Method {
        match self {
            Self::Get => http::Method::GET,
            Self::Post => http::Method::POST,
            Self::Put => http::Method::PUT,
            Self::Patch => http::Method::PATCH,
            Self::Delete => http::Method::DELETE,
            Self::Head => http::Method::HEAD,
            Self::Options => http::Method::OPTIONS,
        }
    }
}

/// The single request every iteration issues.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDescriptor {
    method: HttpMethod,
    url: Option<String>,
    headers: BTreeMap<String, String>,
    body: Option<String>,
}

impl RequestDescriptor {
    /// The body is dropped for methods that cannot carry one.
    #[must_use]
    pub fn new(
        method: HttpMethod,
        url: Option<String>,
        headers: BTreeMap<String, String>,
        body: Option<String>,
    ) -> Self {
        let body = body.filter(|_| method.allows_body());
        Self {
            method,
            url,
            headers,
            body,
        }
    }

    /// Build from raw input values. Never fails: an unknown method becomes GET and
    /// unparseable headers become empty, each with a warning.
    #[must_use]
    pub fn from_raw(
        method: Option<&str>,
        url: Option<&str>,
        headers: Option<&str>,
        body: Option<&str>,
    ) -> Self {
        let method = match method.map(str::trim).filter(|m| !m.is_empty()) {
            None => HttpMethod::Get,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(method = raw, "unsupported HTTP_METHOD; using GET");
                HttpMethod::Get
            }),
        };

        let headers = match headers {
            None => BTreeMap::new(),
            Some(raw) => parse_headers(raw).unwrap_or_else(|err| {
                warn!(error = %err, "HTTP_HEADERS is not a JSON object of strings; ignoring headers");
                BTreeMap::new()
            }),
        };

        Self::new(
            method,
            url.map(str::to_string),
            headers,
            body.map(str::to_string),
        )
    }

    #[must_use]
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

/// Parse a JSON object whose values are all strings.
pub fn parse_headers(raw: &str) -> Result<BTreeMap<String, String>, serde_json::Error> {
    serde_json::from_str(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` with a subscriber that records WARN and above as plain text.
    fn with_captured_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || writer.clone())
            .finish();

        let out = tracing::subscriber::with_default(subscriber, f);
        let logs = String::from_utf8_lossy(&captured.0.lock()).into_owned();
        (out, logs)
    }

    #[test]
    fn malformed_headers_fall_back_to_empty_with_warning() {
        for raw in ["{not json", "[1,2]", r#"{"a": 1}"#, "\"x\""] {
            let (req, logs) = with_captured_logs(|| {
                RequestDescriptor::from_raw(None, Some("http://x"), Some(raw), None)
            });
            assert!(req.headers().is_empty(), "headers {raw:?}");
            assert!(logs.contains("WARN"), "no warning for {raw:?}: {logs}");
            assert!(logs.contains("HTTP_HEADERS"), "warning should name the input: {logs}");
        }
    }

    #[test]
    fn well_formed_headers_log_nothing() {
        let (_, logs) = with_captured_logs(|| {
            RequestDescriptor::from_raw(None, None, Some(r#"{"a": "b"}"#), None)
        });
        assert!(logs.is_empty(), "unexpected logs: {logs}");
    }

    #[test]
    fn well_formed_headers_are_kept() {
        let req = RequestDescriptor::from_raw(
            None,
            None,
            Some(r#"{"Authorization": "Bearer t", "x-test": "1"}"#),
            None,
        );
        assert_eq!(req.headers().len(), 2);
        assert_eq!(
            req.headers().get("x-test").map(String::as_str),
            Some("1")
        );
    }

    #[test]
    fn body_is_dropped_for_get_and_head() {
        for m in ["get", "HEAD"] {
            let req = RequestDescriptor::from_raw(Some(m), None, None, Some("payload"));
            assert_eq!(req.body(), None, "method {m}");
        }
        let req = RequestDescriptor::from_raw(Some("post"), None, None, Some("payload"));
        assert_eq!(req.method(), HttpMethod::Post);
        assert_eq!(req.body(), Some("payload"));
    }

    #[test]
    fn unknown_method_becomes_get() {
        let req = RequestDescriptor::from_raw(Some("BREW"), None, None, Some("coffee"));
        assert_eq!(req.method(), HttpMethod::Get);
        assert_eq!(req.body(), None);
    }

    #[test]
    fn methods_map_to_http() {
        assert_eq!(HttpMethod::Patch.as_http(), http::Method::PATCH);
        assert_eq!(HttpMethod::Options.to_string(), "OPTIONS");
    }
}
