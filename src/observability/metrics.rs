//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_requests_total` (counter): requests by route, status
//! - `edge_request_duration_seconds` (histogram): latency by route
//! - `edge_rtv_resolutions_total` (counter): resolutions by source
//! - `edge_upstream_fetches_total` (counter): storage fetches by variant, status
//! - `edge_cache_lookups_total` (counter): injected-cache lookups by outcome
//! - `edge_cache_writes_total` (counter): injected-cache writes by variant, outcome
//! - `edge_background_tasks_total` (counter): deferred tasks by outcome
//! - `edge_store_reloads_total` (counter): snapshot reloads by namespace, outcome

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(route: &'static str, status: u16, start: Instant) {
    counter!("edge_requests_total", "route" => route, "status" => status.to_string()).increment(1);
    histogram!("edge_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rtv_resolution(source: &'static str) {
    counter!("edge_rtv_resolutions_total", "source" => source).increment(1);
}

pub fn record_upstream_fetch(variant: &'static str, status: u16) {
    counter!("edge_upstream_fetches_total", "variant" => variant, "status" => status.to_string())
        .increment(1);
}

pub fn record_cache_lookup(outcome: &'static str) {
    counter!("edge_cache_lookups_total", "outcome" => outcome).increment(1);
}

pub fn record_cache_write(variant: &'static str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("edge_cache_writes_total", "variant" => variant, "outcome" => outcome).increment(1);
}

pub fn record_background_task(outcome: &'static str) {
    counter!("edge_background_tasks_total", "outcome" => outcome).increment(1);
}

pub fn record_background_abandoned(count: usize) {
    counter!("edge_background_tasks_total", "outcome" => "abandoned").increment(count as u64);
}

pub fn record_store_reload(namespace: &str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("edge_store_reloads_total", "namespace" => namespace.to_string(), "outcome" => outcome)
        .increment(1);
}
