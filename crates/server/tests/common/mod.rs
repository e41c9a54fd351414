//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! backed by a mock origin and real SQLite index and tree files in a
//! temporary directory.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use debridfs_core::{
    testing::MockOrigin, Config, DatabaseConfig, FileTree, GarbageCollector, GcConfig,
    OriginConfig, PollerConfig, Reconciler, RemoteOrigin, ServerConfig, SqliteIndex, SqliteTree,
    StreamResolver, SyncConfig,
};

/// Re-export fixtures for test convenience
pub use debridfs_core::testing::fixtures;

/// Test fixture for E2E testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_sync() {
///     let fixture = TestFixture::new().await;
///     fixture.origin.add_entry(entry, detail).await;
///
///     let response = fixture.post("/api/v1/sync").await;
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock origin - configure the remote catalog
    pub origin: Arc<MockOrigin>,
    pub index: Arc<SqliteIndex>,
    pub tree: Arc<dyn FileTree>,
    pub reconciler: Arc<Reconciler>,
    /// Temporary directory for the test databases
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a new test fixture with an empty catalog.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let index_path = temp_dir.path().join("index.db");
        let tree_path = temp_dir.path().join("tree.db");

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                index_path: index_path.clone(),
                tree_path: tree_path.clone(),
            },
            origin: OriginConfig {
                api_url: "http://127.0.0.1:1/rest/1.0".to_string(),
                api_token: "test-secret-token".to_string(),
                timeout_secs: 5,
            },
            library: fixtures::library_config(),
            sync: SyncConfig {
                page_size: 100,
                sync_on_startup: false,
            },
            poller: PollerConfig::default(),
            gc: GcConfig::default(),
        };

        let origin = Arc::new(MockOrigin::new());
        let index = Arc::new(SqliteIndex::new(&index_path).expect("Failed to create index"));
        let tree: Arc<dyn FileTree> =
            Arc::new(SqliteTree::new(&tree_path).expect("Failed to create tree"));

        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&index),
            Arc::clone(&tree),
            Arc::clone(&origin) as Arc<dyn RemoteOrigin>,
            config.library.clone(),
            &config.sync,
        ));
        let resolver = Arc::new(StreamResolver::new(
            Arc::clone(&index),
            Arc::clone(&tree),
            Arc::clone(&origin) as Arc<dyn RemoteOrigin>,
            fixtures::CONTENT_TYPE,
        ));
        let gc = Arc::new(GarbageCollector::new(
            Arc::clone(&tree),
            fixtures::LIBRARY_ROOT,
        ));

        let state = Arc::new(debridfs_server::state::AppState::new(
            config,
            Arc::clone(&index),
            Arc::clone(&reconciler),
            resolver,
            gc,
        ));

        let router = debridfs_server::api::create_router(state);

        Self {
            router,
            origin,
            index,
            tree,
            reconciler,
            temp_dir,
        }
    }

    /// Node ids of the mirrored files of a remote entry.
    pub fn file_nodes(&self, remote_id: &str) -> Vec<i64> {
        let torrent = self
            .index
            .torrent(remote_id)
            .expect("Failed to query index")
            .expect("Torrent not ingested");
        self.index
            .files_for_torrent(torrent.id)
            .expect("Failed to query files")
            .into_iter()
            .map(|f| f.node_id)
            .collect()
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path).await
    }

    /// Send a POST request without a body.
    pub async fn post(&self, path: &str) -> TestResponse {
        self.request("POST", path).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).to_string();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
