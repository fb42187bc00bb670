use std::future::Future;
use std::time::Duration;

use tracing::debug;
use vuprobe_http::{HttpClient, HttpRequest};

use crate::request::RequestDescriptor;

/// What came back from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    /// First non-blank line of the body, when there is one.
    pub message: Option<String>,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// The request never produced a status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub message: String,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransportError {}

/// Issues one request per call.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        req: &RequestDescriptor,
        url: &str,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: HttpClient,
    timeout: Duration,
}

impl HttpTransport {
    #[must_use]
    pub fn new(client: HttpClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

impl Transport for HttpTransport {
    async fn send(
        &self,
        req: &RequestDescriptor,
        url: &str,
    ) -> Result<TransportResponse, TransportError> {
        let headers = req
            .headers()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut request = HttpRequest::new(req.method().as_http(), url)
            .with_headers(headers)
            .with_timeout(Some(self.timeout));
        if let Some(body) = req.body() {
            request = request.with_body(body.to_string());
        }

        match self.client.request(request).await {
            Ok(res) => Ok(TransportResponse {
                status: res.status,
                message: res.body_first_line().map(str::to_string),
                bytes_sent: res.bytes_sent,
                bytes_received: res.bytes_received,
            }),
            Err(err) => {
                let kind = err.transport_error_kind();
                debug!(%kind, error = %err, url, "transport error");
                Err(TransportError {
                    message: err.to_string(),
                })
            }
        }
    }
}
