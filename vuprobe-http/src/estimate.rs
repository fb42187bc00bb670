use super::{Error, HttpRequest, Result};

const CRLF: u64 = 2;
const HTTP11: &str = "HTTP/1.1";

pub(crate) struct Target {
    pub(crate) url: url::Url,
    pub(crate) uri: hyper::Uri,
}

impl Target {
    pub(crate) fn parse(raw: &str) -> Result<Self> {
        let url = url::Url::parse(raw).map_err(|_| Error::InvalidUrl(raw.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::UnsupportedScheme(raw.to_string()));
        }
        let uri = raw
            .parse::<hyper::Uri>()
            .map_err(|_| Error::InvalidUrl(raw.to_string()))?;
        Ok(Self { url, uri })
    }

    /// `Host` header value: the port is only spelled out when it differs from the scheme
    /// default.
    pub(crate) fn host_header(&self) -> Option<String> {
        let host = self.url.host_str()?;
        Some(match self.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }
}

/// Best-effort size of an HTTP/1.1 request on the wire.
///
/// Host and Content-Length are counted even when the caller did not set them; the client
/// adds both before sending.
pub(crate) fn request_bytes(req: &HttpRequest, target: &Target) -> u64 {
    let path = target
        .uri
        .path_and_query()
        .map_or("/", |p| p.as_str());

    // METHOD SP path SP HTTP/1.1 CRLF
    let mut total = len(req.method.as_str()) + 1 + len(path) + 1 + len(HTTP11) + CRLF;

    total += req
        .headers
        .iter()
        .map(|(k, v)| header_line(k.as_bytes(), v.as_bytes()))
        .sum::<u64>();

    if !req.has_header("host")
        && let Some(host) = target.host_header()
    {
        total += header_line(b"host", host.as_bytes());
    }

    let body_len = req.body.len() as u64;
    if body_len > 0 && !req.has_header("content-length") {
        total += header_line(b"content-length", body_len.to_string().as_bytes());
    }

    total + CRLF + body_len
}

pub(crate) fn response_head_bytes(status: http::StatusCode, headers: &http::HeaderMap) -> u64 {
    // HTTP/1.1 SP 200 CRLF (reason phrase ignored)
    let status_line = len(HTTP11) + 1 + len(status.as_str()) + CRLF;
    let header_bytes = headers
        .iter()
        .map(|(name, value)| header_line(name.as_str().as_bytes(), value.as_bytes()))
        .sum::<u64>();
    status_line + header_bytes + CRLF
}

fn header_line(name: &[u8], value: &[u8]) -> u64 {
    // name: value CRLF
    name.len() as u64 + 2 + value.len() as u64 + CRLF
}

fn len(s: &str) -> u64 {
    s.len() as u64
}
