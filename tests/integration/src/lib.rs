//! End-to-end tests for proxysync.
//!
//! Each test wires the real reconciler, signed fetcher and atomic publisher
//! together and points the fetcher at a loopback HTTP responder that plays
//! the object store. No external services are needed:
//!
//! ```text
//! cargo test -p proxysync-integration
//! ```

use std::sync::{Arc, Once};

use parking_lot::Mutex;
use proxysync_auth::Credentials;
use proxysync_core::{AtomicPublisher, ConfigState, Reconciler, SignedFetcher};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Tracked file name used by every harness.
pub const TRACKED_KEY: &str = "traefik.yaml";

/// Extra store buckets configured on every harness.
pub const EXTRA_BUCKETS: [&str; 2] = ["cache", "logs"];

/// Contents of the artifact seeded at startup.
pub const DEFAULT_ARTIFACT: &[u8] = b"http: {}\n";

/// A loopback stand-in for the object store.
///
/// Every connection receives the same canned response; the request head of
/// each one is recorded.
#[derive(Debug)]
pub struct ObjectStore {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ObjectStore {
    /// Start a responder answering `status_line` (e.g. `"200 OK"`) with `body`.
    pub async fn start(status_line: &'static str, body: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind loopback listener");
        let addr = listener.local_addr().expect("listener has no address");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut head = Vec::new();
                let mut chunk = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => head.extend_from_slice(&chunk[..n]),
                    }
                }
                seen.lock().push(String::from_utf8_lossy(&head).into_owned());

                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self {
            base_url: format!("http://{addr}/"),
            requests,
        }
    }

    /// Base URL to put in `synced_config` records.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of requests received so far.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.requests.lock().len()
    }

    /// Recorded request heads, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

/// Reconciler, state and staging directory wired as the binary wires them.
#[derive(Debug)]
pub struct Harness {
    /// Staging directory; removed on drop.
    pub dir: TempDir,
    /// The reconciler under test.
    pub reconciler: Reconciler,
    /// Current state.
    pub state: ConfigState,
}

impl Harness {
    /// Build a harness whose fetcher signs requests with test credentials.
    #[must_use]
    pub fn new() -> Self {
        init_tracing();

        let dir = tempfile::tempdir().expect("failed to create staging dir");
        let publisher = AtomicPublisher::new(dir.path());
        let seeded = publisher
            .publish(DEFAULT_ARTIFACT, ".yaml", None)
            .expect("failed to seed default artifact");

        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .expect("failed to build client");
        let fetcher = SignedFetcher::with_client(client, Credentials::new("test", "test"));

        let extras: Vec<String> = EXTRA_BUCKETS.iter().map(|b| (*b).to_owned()).collect();
        let state = ConfigState::new(seeded, &extras);
        let reconciler = Reconciler::new(Arc::new(fetcher), publisher, extras, TRACKED_KEY);

        Self {
            dir,
            reconciler,
            state,
        }
    }

    /// Feed raw channel text through the reconciler and return the dirty flag.
    pub async fn feed(&mut self, text: &str) -> bool {
        let batch = proxysync_core::NotificationBatch::parse(text);
        self.reconciler.reconcile(&mut self.state, &batch).await
    }

    /// Contents of the currently tracked file.
    #[must_use]
    pub fn tracked_contents(&self) -> Vec<u8> {
        std::fs::read(&self.state.tracked_file_path).expect("tracked file must exist")
    }

    /// Number of files in the staging directory.
    #[must_use]
    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(self.dir.path())
            .expect("staging dir must exist")
            .count()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// A `synced_config` batch with one successful record for the tracked file.
#[must_use]
pub fn synced_config_batch(url: &str, last_modified: &str) -> String {
    format!(
        "synced_config\n{{\"status\":\"success\",\"type\":\"file\",\"key\":\"{TRACKED_KEY}\",\"url\":\"{url}\",\"lastModified\":\"{last_modified}\"}}\n"
    )
}

mod test_bucket_events;
mod test_synced_config;
