use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{any, get, post};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

pub const PATH_OK: &str = "/ok";
pub const PATH_STATUS: &str = "/status/{code}";
pub const PATH_SLOW: &str = "/slow";
pub const PATH_ECHO: &str = "/echo";
pub const PATH_AUTH: &str = "/auth";

/// Bearer token accepted by [`PATH_AUTH`].
pub const AUTH_TOKEN: &str = "letmein";

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    saw_custom_header: Arc<AtomicU64>,
    saw_body: Arc<AtomicU64>,
}

impl TestServerStats {
    fn inc_requests_total(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Requests that carried `x-test: 1`.
    pub fn saw_custom_header(&self) -> u64 {
        self.saw_custom_header.load(Ordering::Relaxed)
    }

    /// Requests that carried a non-empty body.
    pub fn saw_body(&self) -> u64 {
        self.saw_body.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct TestServerUrls {
    pub base_url: String,
    pub ok: String,
    pub slow: String,
    pub echo: String,
    pub auth: String,
}

impl TestServerUrls {
    pub fn new(base_url: String) -> Self {
        Self {
            ok: format!("{base_url}{PATH_OK}"),
            slow: format!("{base_url}{PATH_SLOW}"),
            echo: format!("{base_url}{PATH_ECHO}"),
            auth: format!("{base_url}{PATH_AUTH}"),
            base_url,
        }
    }

    /// URL that always answers with `code`.
    pub fn status(&self, code: u16) -> String {
        format!("{}/status/{code}", self.base_url)
    }
}

async fn handle_ok(State(stats): State<TestServerStats>) -> &'static str {
    stats.inc_requests_total();
    "ok"
}

async fn handle_status(
    State(stats): State<TestServerStats>,
    Path(code): Path<u16>,
) -> (StatusCode, String) {
    stats.inc_requests_total();
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, format!("status {code}\nsecond line"))
}

async fn handle_slow(State(stats): State<TestServerStats>) -> &'static str {
    stats.inc_requests_total();
    sleep(Duration::from_millis(50)).await;
    "slow"
}

async fn handle_echo(
    State(stats): State<TestServerStats>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Bytes) {
    stats.inc_requests_total();

    if headers.get("x-test").and_then(|v| v.to_str().ok()) == Some("1") {
        stats.saw_custom_header.fetch_add(1, Ordering::Relaxed);
    }
    if !body.is_empty() {
        stats.saw_body.fetch_add(1, Ordering::Relaxed);
    }

    (StatusCode::OK, body)
}

async fn handle_auth(State(stats): State<TestServerStats>, headers: HeaderMap) -> StatusCode {
    stats.inc_requests_total();

    let expected = format!("Bearer {AUTH_TOKEN}");
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(v) if v == expected => StatusCode::OK,
        Some(_) => StatusCode::FORBIDDEN,
        None => StatusCode::UNAUTHORIZED,
    }
}

pub fn router(stats: TestServerStats) -> Router {
    Router::new()
        .route(PATH_OK, get(handle_ok))
        .route(PATH_STATUS, any(handle_status))
        .route(PATH_SLOW, get(handle_slow))
        .route(PATH_ECHO, post(handle_echo))
        .route(PATH_AUTH, any(handle_auth))
        .with_state(stats)
}

pub struct TestServer {
    addr: SocketAddr,
    urls: TestServerUrls,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();
        let app = router(stats.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        Ok(Self {
            addr,
            urls: TestServerUrls::new(format!("http://{addr}")),
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.urls.base_url
    }

    pub fn urls(&self) -> &TestServerUrls {
        &self.urls
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
