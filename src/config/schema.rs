//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EdgeConfig {
    /// Listener configuration (bind address, concurrency).
    pub listener: ListenerConfig,

    /// Backing object storage holding the immutable RTV builds.
    pub storage: StorageConfig,

    /// Version and experiment-config snapshots written by the syncer.
    pub stores: StoresConfig,

    /// Injected-content cache settings.
    pub cache: CacheConfig,

    /// Request headers carrying visitor geography.
    pub geo: GeoConfig,

    /// Static site endpoints (redirect, favicon, public origin).
    pub site: SiteConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum requests served concurrently (backpressure).
    pub max_concurrent_requests: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_concurrent_requests: 10_000,
        }
    }
}

/// Object storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base URL that RTV directories live under. Must end with `/`.
    pub base_url: String,

    /// Suffix of the pre-compressed sibling of every stored file.
    pub compressed_suffix: String,

    /// Per-fetch timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: "https://storage.googleapis.com/org-cdn/org-cdn/rtv/".to_string(),
            compressed_suffix: ".br".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Key-value snapshot configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoresConfig {
    /// JSON object mapping channel names to RTVs.
    pub versions_path: Option<String>,

    /// JSON object mapping config keys to arbitrary JSON values.
    pub config_path: Option<String>,

    /// Reload snapshots when the files change on disk.
    pub watch: bool,

    /// Config key holding the experiment configuration.
    pub experiments_key: String,
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            versions_path: None,
            config_path: None,
            watch: true,
            experiments_key: "AMP_EXP".to_string(),
        }
    }
}

/// Injected-content cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum resident entries (plain and compressed count separately).
    pub max_entries: usize,

    /// Brotli quality used for the compressed variant (0-11).
    pub compression_quality: u32,

    /// How long shutdown waits for pending cache writes, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 4096,
            compression_quality: 11,
            shutdown_grace_secs: 5,
        }
    }
}

/// Geolocation header names supplied by the edge platform.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeoConfig {
    pub country_header: String,
    pub region_header: String,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            country_header: "cf-ipcountry".to_string(),
            region_header: "cf-region-code".to_string(),
        }
    }
}

/// Fixed site endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Where `GET /` redirects to.
    pub redirect_url: String,

    /// Upstream location of `/favicon.ico`.
    pub favicon_url: String,

    /// Public origin used in generated URLs. Derived from the Host header when unset.
    pub public_origin: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            redirect_url: "https://amp.dev/".to_string(),
            favicon_url: "https://amp.dev/static/img/favicon.png".to_string(),
            public_origin: None,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
