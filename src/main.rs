//! rtv-edge
//!
//! Serves immutable runtime builds from object storage, picking the build
//! (RTV) for unversioned requests and injecting experiment and geography
//! data into the files that need it.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ routing ──▶ handler
//!                                                    │
//!                      ┌─────────────────────────────┼───────────────────────┐
//!                      ▼                             ▼                       ▼
//!                 rtv resolver               injected cache            storage client
//!                 (version store)        (blob cache, brotli)        (plain + .br sibling)
//!                                                    │                       │
//!                                                    │                       ▼
//!                                                    │                   injectors
//!                                                    │          (experiments, geography)
//!                                                    ▼
//!                                          background executor
//!     Client Response
//!     ◀────────────── response (cache policy, shared headers)
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use rtv_edge::cache::{BackgroundExecutor, BrotliEngine, MemoryBlobCache};
use rtv_edge::config::{load_config, EdgeConfig};
use rtv_edge::http::{Collaborators, HttpServer};
use rtv_edge::lifecycle::{shutdown_on_signal, Shutdown};
use rtv_edge::observability::{logging, metrics};
use rtv_edge::rtv::RtvResolver;
use rtv_edge::storage::HttpObjectStorage;
use rtv_edge::store::{KvNamespace, SnapshotWatcher};

#[derive(Parser)]
#[command(name = "rtv-edge")]
#[command(about = "Edge server for versioned runtime builds", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when it does not exist.
    #[arg(short, long, default_value = "rtv-edge.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        load_config(&cli.config)?
    } else {
        EdgeConfig::default()
    };

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rtv-edge starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        storage = %config.storage.base_url,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Stores and their watchers; watchers stop when dropped.
    let versions = open_namespace("versions", config.stores.versions_path.as_deref())?;
    let config_store = open_namespace("config", config.stores.config_path.as_deref())?;
    let mut watchers = Vec::new();
    if config.stores.watch {
        for (path, namespace) in [
            (config.stores.versions_path.as_deref(), &versions),
            (config.stores.config_path.as_deref(), &config_store),
        ] {
            if let Some(path) = path {
                watchers.push(SnapshotWatcher::new(Path::new(path), namespace.clone()).run()?);
            }
        }
    }

    RtvResolver::new(versions.clone()).ensure_stable().await?;

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    let (executor, tasks) =
        BackgroundExecutor::new(Duration::from_secs(config.cache.shutdown_grace_secs));
    let executor = tokio::spawn(executor.run(shutdown.subscribe()));

    let collaborators = Collaborators {
        versions,
        config_store,
        objects: Arc::new(HttpObjectStorage::new(Duration::from_secs(
            config.storage.request_timeout_secs,
        ))?),
        blobs: Arc::new(MemoryBlobCache::new(config.cache.max_entries)),
        compressor: Arc::new(BrotliEngine),
        tasks,
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config, collaborators)?;
    server.run(listener, shutdown.clone()).await?;

    // Stop the executor whether the server exited on a signal or an error.
    shutdown.trigger();
    if let Err(e) = executor.await {
        tracing::error!(error = %e, "Background executor failed");
    }
    drop(watchers);

    tracing::info!("Shutdown complete");
    Ok(())
}

fn open_namespace(
    name: &str,
    path: Option<&str>,
) -> Result<Arc<KvNamespace>, Box<dyn std::error::Error>> {
    let namespace = match path {
        Some(path) => {
            let namespace = KvNamespace::load_from_file(name, Path::new(path))?;
            tracing::info!(
                namespace = name,
                path,
                entries = namespace.len(),
                "Store snapshot loaded"
            );
            namespace
        }
        None => {
            tracing::warn!(namespace = name, "No snapshot configured, store is empty");
            KvNamespace::new(name)
        }
    };
    Ok(Arc::new(namespace))
}
