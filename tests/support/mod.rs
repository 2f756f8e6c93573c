// ABOUTME: Test support utilities.
// ABOUTME: Provides ZIP builders, a scriptable version control fake, and a mock proxy admin API.

use async_trait::async_trait;
use bitswan_gitops::vcs::{CommitOutcome, SyncError, VersionControl};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use zip::write::SimpleFileOptions;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("bitswan_gitops=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Build an in-memory ZIP archive from `(name, content)` pairs.
#[allow(dead_code)]
pub fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Write a ZIP archive to `dir/name` and return its path.
#[allow(dead_code)]
pub fn write_zip(dir: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, zip_bytes(files)).unwrap();
    path
}

// =============================================================================
// Version control fake
// =============================================================================

/// Records every call; can be told to fail one step.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeVcs {
    remote: bool,
    fail_on: Option<&'static str>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

#[allow(dead_code)]
impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remote(mut self) -> Self {
        self.remote = true;
        self
    }

    /// Fail the named step: "pull", "stage", "commit" or "push".
    pub fn failing_on(mut self, step: &'static str) -> Self {
        self.fail_on = Some(step);
        self
    }

    /// Sleep inside commit, widening the critical section.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of commits observed running at once.
    pub fn max_concurrent_commits(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn record(&self, call: String, step: &str) -> Result<(), SyncError> {
        self.calls.lock().unwrap().push(call);
        if self.fail_on == Some(step) {
            return Err(SyncError::CommandFailed {
                command: step.to_string(),
                status: "exit code 1".to_string(),
                detail: format!("simulated {step} failure"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VersionControl for FakeVcs {
    async fn has_remote(&self) -> Result<bool, SyncError> {
        self.calls.lock().unwrap().push("has_remote".to_string());
        Ok(self.remote)
    }

    async fn pull(&self) -> Result<(), SyncError> {
        self.record("pull".to_string(), "pull")
    }

    async fn stage(&self, path: &Path) -> Result<(), SyncError> {
        self.record(format!("stage {}", path.display()), "stage")
    }

    async fn commit(&self, message: &str) -> Result<CommitOutcome, SyncError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        self.record(format!("commit {message}"), "commit")?;
        Ok(CommitOutcome::Committed)
    }

    async fn push(&self) -> Result<(), SyncError> {
        self.record("push".to_string(), "push")
    }
}

// =============================================================================
// Mock proxy admin API
// =============================================================================

/// A request the mock proxy received.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

#[allow(dead_code)]
#[derive(Default)]
struct ProxyState {
    upstreams: Vec<String>,
    post_status: Option<u16>,
    requests: Vec<RecordedRequest>,
}

/// Minimal Caddy admin API: lists upstreams and accepts route POSTs.
#[allow(dead_code)]
pub struct MockProxy {
    addr: std::net::SocketAddr,
    state: Arc<Mutex<ProxyState>>,
}

#[allow(dead_code)]
impl MockProxy {
    pub async fn start() -> Self {
        Self::start_with(Vec::new(), None).await
    }

    /// Start with existing upstream addresses and an optional forced POST status.
    pub async fn start_with(upstreams: Vec<&str>, post_status: Option<u16>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(ProxyState {
            upstreams: upstreams.into_iter().map(str::to_string).collect(),
            post_status,
            requests: Vec::new(),
        }));

        let shared = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = shared.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, state).await;
                });
            }
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn posts(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "POST")
            .collect()
    }
}

async fn serve(mut stream: TcpStream, state: Arc<Mutex<ProxyState>>) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();
    let content_length = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    let (status, response) = {
        let mut state = state.lock().unwrap();
        state.requests.push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
            body: body.clone(),
        });

        match (method.as_str(), path.as_str()) {
            ("GET", "/reverse_proxy/upstreams") => {
                let list: Vec<_> = state
                    .upstreams
                    .iter()
                    .map(|a| serde_json::json!({ "address": a, "num_requests": 0, "fails": 0 }))
                    .collect();
                (200, serde_json::to_string(&list).unwrap())
            }
            ("POST", p) if p.starts_with("/config/apps/http/servers/srv0/routes") => {
                match state.post_status {
                    Some(code) => (code, r#"{"error":"rejected"}"#.to_string()),
                    None => {
                        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&body)
                            && let Some(dial) =
                                value[0]["handle"][0]["routes"][0]["handle"][0]["upstreams"][0]
                                    ["dial"]
                                    .as_str()
                        {
                            state.upstreams.push(dial.to_string());
                        }
                        (200, String::new())
                    }
                }
            }
            _ => (404, String::new()),
        }
    };

    let reply = format!(
        "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{response}",
        response.len()
    );
    stream.write_all(reply.as_bytes()).await?;
    stream.shutdown().await
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
