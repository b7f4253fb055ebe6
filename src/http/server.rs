//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router and its shared state
//! - Wire up middleware (request ID, tracing, timeout, concurrency limit,
//!   response compression)
//! - Bind the server to a listener and stop on shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::routing::any;
use tokio::net::TcpListener;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    compression::{predicate::DefaultPredicate, CompressionLayer, Predicate},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::cache::{BackgroundTasks, BlobCache, CompressionEngine, InjectedCache};
use crate::config::EdgeConfig;
use crate::http::handlers::edge_handler;
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::http::response::NotPreEncoded;
use crate::lifecycle::Shutdown;
use crate::routing::Router as EdgeRouter;
use crate::rtv::RtvResolver;
use crate::storage::{ObjectStorage, StorageClient};
use crate::store::{ConfigStore, VersionStore};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<EdgeRouter>,
    pub resolver: RtvResolver,
    pub versions: Arc<dyn VersionStore>,
    pub config_store: Arc<dyn ConfigStore>,
    pub storage: StorageClient,
    pub cache: InjectedCache,
    pub config: Arc<EdgeConfig>,
}

/// External collaborators the server is built from.
pub struct Collaborators {
    pub versions: Arc<dyn VersionStore>,
    pub config_store: Arc<dyn ConfigStore>,
    pub objects: Arc<dyn ObjectStorage>,
    pub blobs: Arc<dyn BlobCache>,
    pub compressor: Arc<dyn CompressionEngine>,
    pub tasks: BackgroundTasks,
}

/// HTTP server for the edge.
pub struct HttpServer {
    router: axum::Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: EdgeConfig, collaborators: Collaborators) -> Result<Self, regex::Error> {
        let cache = InjectedCache::new(
            collaborators.blobs,
            collaborators.compressor,
            collaborators.tasks,
            config.cache.compression_quality,
        );

        let state = AppState {
            router: Arc::new(EdgeRouter::new()?),
            resolver: RtvResolver::new(collaborators.versions.clone()),
            versions: collaborators.versions,
            config_store: collaborators.config_store,
            storage: StorageClient::new(collaborators.objects, &config.storage),
            cache,
            config: Arc::new(config),
        };

        let router = Self::build_router(state);
        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> axum::Router {
        let request_timeout = Duration::from_secs(state.config.timeouts.request_secs);
        let max_concurrent = state.config.listener.max_concurrent_requests;

        axum::Router::new()
            .route("/{*path}", any(edge_handler))
            .route("/", any(edge_handler))
            .with_state(state)
            .layer(
                CompressionLayer::new()
                    .compress_when(DefaultPredicate::new().and(NotPreEncoded)),
            )
            .layer(TimeoutLayer::new(request_timeout))
            .layer(ConcurrencyLimitLayer::new(max_concurrent))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// The router, for serving or for driving requests directly.
    pub fn router(&self) -> axum::Router {
        self.router.clone()
    }

    /// Run the server, accepting connections until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: Shutdown,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
