//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mirror_cache_hits_total` (counter): requests answered from the mirror
//! - `mirror_cache_misses_total` (counter): requests that went upstream
//! - `mirror_fetches_total` (counter): upstream fetches by `outcome`
//! - `mirror_fetch_bytes_total` (counter): bytes persisted into the mirror
//! - `mirror_fetch_duration_seconds` (histogram): time per upstream fetch
//! - `mirror_fetch_coalesced_total` (counter): misses that joined a running fetch

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with its own HTTP listener.
///
/// Must be called from inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a resolver lookup.
pub fn record_lookup(hit: bool) {
    if hit {
        counter!("mirror_cache_hits_total").increment(1);
    } else {
        counter!("mirror_cache_misses_total").increment(1);
    }
}

/// Record a finished upstream fetch.
pub fn record_fetch(outcome: &'static str, bytes: u64, started: Instant) {
    counter!("mirror_fetches_total", "outcome" => outcome).increment(1);
    if bytes > 0 {
        counter!("mirror_fetch_bytes_total").increment(bytes);
    }
    histogram!("mirror_fetch_duration_seconds").record(started.elapsed().as_secs_f64());
}

/// Record a miss that waited on another request's fetch.
pub fn record_coalesced() {
    counter!("mirror_fetch_coalesced_total").increment(1);
}
