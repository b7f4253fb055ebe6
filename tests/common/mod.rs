//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;

use rtv_edge::cache::{
    BackgroundExecutor, BackgroundTasks, BlobCache, BrotliEngine, MemoryBlobCache,
};
use rtv_edge::config::EdgeConfig;
use rtv_edge::http::{Collaborators, HttpServer};
use rtv_edge::lifecycle::Shutdown;
use rtv_edge::storage::MemoryObjectStorage;
use rtv_edge::store::KvNamespace;

pub const BASE_URL: &str = "https://storage.example.com/rtv/";

/// An edge server wired to in-memory collaborators.
pub struct TestEdge<B = MemoryBlobCache> {
    pub app: axum::Router,
    pub objects: Arc<MemoryObjectStorage>,
    pub versions: Arc<KvNamespace>,
    pub config_store: Arc<KvNamespace>,
    pub blobs: Arc<B>,
    pub tasks: BackgroundTasks,
    pub shutdown: Shutdown,
}

impl TestEdge {
    /// Build an edge whose version store holds `versions`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(versions: &[(&str, &str)]) -> Self {
        Self::with_config(versions, Value::Null)
    }

    /// Build an edge with an experiment config stored under `AMP_EXP`.
    pub fn with_config(versions: &[(&str, &str)], experiments: Value) -> Self {
        TestEdge::with_blob_cache(versions, experiments, Arc::new(MemoryBlobCache::new(64)))
    }
}

impl<B: BlobCache + 'static> TestEdge<B> {
    /// Build an edge whose injected cache is backed by `blobs`.
    pub fn with_blob_cache(
        versions: &[(&str, &str)],
        experiments: Value,
        blobs: Arc<B>,
    ) -> Self {
        let mut config = EdgeConfig::default();
        config.storage.base_url = BASE_URL.to_string();

        let objects = Arc::new(MemoryObjectStorage::new());
        let versions = Arc::new(KvNamespace::from_entries("versions", versions.iter().copied()));
        let config_store = Arc::new(KvNamespace::from_entries(
            "config",
            [("AMP_EXP", experiments)],
        ));

        let shutdown = Shutdown::new();
        let (executor, tasks) = BackgroundExecutor::new(Duration::from_secs(1));
        tokio::spawn(executor.run(shutdown.subscribe()));

        let server = HttpServer::new(
            config,
            Collaborators {
                versions: versions.clone(),
                config_store: config_store.clone(),
                objects: objects.clone(),
                blobs: blobs.clone(),
                compressor: Arc::new(BrotliEngine),
                tasks: tasks.clone(),
            },
        )
        .unwrap();

        Self {
            app: server.router(),
            objects,
            versions,
            config_store,
            blobs,
            tasks,
            shutdown,
        }
    }

    /// Store a file of build `rtv` in object storage.
    pub fn put_file(&self, rtv: &str, path: &str, body: &str, content_type: &str) {
        let url = format!("{BASE_URL}{rtv}{path}");
        self.objects.insert(url, body.to_string(), Some(content_type));
    }

    /// Store the pre-compressed sibling of a file.
    pub fn put_compressed(&self, rtv: &str, path: &str, body: Vec<u8>) {
        self.objects.insert(format!("{BASE_URL}{rtv}{path}.br"), body, None);
    }

    /// Issue a GET request with extra headers.
    pub async fn get(&self, uri: &str, headers: &[(&str, &str)]) -> Response<Body> {
        self.request("GET", uri, headers).await
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        headers: &[(&str, &str)],
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.app
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }
}

/// Collect a response body.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_string(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

/// Decode a brotli body.
pub async fn decompress(data: &[u8]) -> String {
    let mut decoder = async_compression::tokio::bufread::BrotliDecoder::new(data);
    let mut output = String::new();
    decoder.read_to_string(&mut output).await.unwrap();
    output
}

/// A canned object served by [`start_mock_bucket`].
#[derive(Clone)]
pub struct MockObject {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub body: &'static str,
}

/// Start a minimal HTTP bucket on an ephemeral port.
///
/// Paths not in `objects` answer `404 Not Found`.
pub async fn start_mock_bucket(objects: HashMap<&'static str, MockObject>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let objects = Arc::new(objects);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let objects = objects.clone();
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 4096];
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        let head = String::from_utf8_lossy(&buf[..n]);
                        let path = head.split_whitespace().nth(1).unwrap_or("/");

                        let object = objects.get(path).cloned().unwrap_or(MockObject {
                            status: 404,
                            content_type: None,
                            body: "",
                        });
                        let status_line = match object.status {
                            200 => "200 OK",
                            403 => "403 Forbidden",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            _ => "200 OK",
                        };
                        let content_type = object
                            .content_type
                            .map(|ct| format!("Content-Type: {ct}\r\n"))
                            .unwrap_or_default();

                        let response = format!(
                            "HTTP/1.1 {}\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_line,
                            content_type,
                            object.body.len(),
                            object.body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}
