use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

pub const PATH_HELLO: &str = "/hello";
pub const PATH_SLOW: &str = "/slow";
pub const PATH_ECHO: &str = "/echo";
pub const PATH_FAIL: &str = "/fail";

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    saw_form_content_type: Arc<AtomicU64>,
    saw_custom_header: Arc<AtomicU64>,
}

impl TestServerStats {
    fn inc_requests_total(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_saw_form_content_type(&self) {
        self.saw_form_content_type.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_saw_custom_header(&self) {
        self.saw_custom_header.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn saw_form_content_type(&self) -> u64 {
        self.saw_form_content_type.load(Ordering::Relaxed)
    }

    pub fn saw_custom_header(&self) -> u64 {
        self.saw_custom_header.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct TestServerUrls {
    pub base_url: String,
    pub hello: String,
    pub slow: String,
    pub echo: String,
    pub fail: String,
}

impl TestServerUrls {
    pub fn new(base_url: String) -> Self {
        Self {
            hello: format!("{base_url}{PATH_HELLO}"),
            slow: format!("{base_url}{PATH_SLOW}"),
            echo: format!("{base_url}{PATH_ECHO}"),
            fail: format!("{base_url}{PATH_FAIL}"),
            base_url,
        }
    }
}

async fn handle_hello(State(stats): State<TestServerStats>, headers: HeaderMap) -> &'static str {
    stats.inc_requests_total();

    if headers.get("x-load-test").and_then(|v| v.to_str().ok()) == Some("1") {
        stats.inc_saw_custom_header();
    }

    "Hello World!"
}

/// Responds after `ms` milliseconds (default 50). Use a delay above the
/// client timeout to force timeout classification.
async fn handle_slow(
    State(stats): State<TestServerStats>,
    Query(query): Query<HashMap<String, String>>,
) -> &'static str {
    stats.inc_requests_total();

    let ms = query
        .get("ms")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(50);
    sleep(Duration::from_millis(ms)).await;

    "slow"
}

async fn handle_echo(
    State(stats): State<TestServerStats>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Bytes) {
    stats.inc_requests_total();

    if headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| {
            v.to_ascii_lowercase()
                .starts_with("application/x-www-form-urlencoded")
        })
    {
        stats.inc_saw_form_content_type();
    }

    (StatusCode::OK, body)
}

async fn handle_fail(State(stats): State<TestServerStats>) -> StatusCode {
    stats.inc_requests_total();
    StatusCode::INTERNAL_SERVER_ERROR
}

pub fn router(stats: TestServerStats) -> Router {
    Router::new()
        .route(PATH_HELLO, get(handle_hello))
        .route(PATH_SLOW, get(handle_slow))
        .route(PATH_ECHO, post(handle_echo))
        .route(PATH_FAIL, get(handle_fail))
        .with_state(stats)
}

pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
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

        let base_url = format!("http://{addr}");
        let urls = TestServerUrls::new(base_url.clone());

        Ok(Self {
            addr,
            base_url,
            urls,
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
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
