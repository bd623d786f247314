//! Shared helpers for the photoline conformance test suite.
//!
//! Provides [`spawn_server`], which binds a `TcpListener` on an ephemeral
//! port, wires up an in-process server backed by `MemoryStorage` and a
//! throwaway data directory, and hands back everything a test needs to
//! drive it over real HTTP.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use photoline_server::{build_router, MemoryStorage, ServerConfig, Storage};
use tempfile::TempDir;

/// Long-poll deadline used by conformance servers.
pub const POLL_TIMEOUT: Duration = Duration::from_millis(800);

/// Re-query interval used by conformance servers.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A running in-process server.
///
/// The data directory lives as long as this value; drop it at the end of
/// the test.
pub struct TestServer {
    /// e.g. `http://127.0.0.1:51234`
    pub base_url: String,
    /// The store the server uses, for seeding without going through HTTP.
    pub storage: Arc<MemoryStorage>,
    data_dir: TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Holds `image/` and `icon/`.
    pub fn data_dir(&self) -> &Path {
        self.data_dir.path()
    }
}

/// Start an ephemeral in-process server.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound or the server fails to start.
pub async fn spawn_server() -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");
    let base_url = format!("http://{addr}");

    let data_dir = tempfile::tempdir().expect("create data dir");
    let mem_storage = Arc::new(MemoryStorage::new());
    let storage: Arc<dyn Storage> = Arc::clone(&mem_storage) as Arc<dyn Storage>;

    let config = ServerConfig {
        bind_addr: addr,
        data_dir: data_dir.path().to_path_buf(),
        tmp_dir: data_dir.path().to_path_buf(),
        poll_timeout: POLL_TIMEOUT,
        poll_interval: POLL_INTERVAL,
        ..ServerConfig::default()
    };
    let router = build_router(storage, config);

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("conformance server error");
    });

    TestServer {
        base_url,
        storage: mem_storage,
        data_dir,
    }
}
