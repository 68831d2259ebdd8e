//! Extraction metrics, recorded through the `metrics` facade.
//!
//! Nothing is exported unless a recorder is installed; `init_metrics` installs
//! the Prometheus exporter for long `run` invocations.

use std::net::SocketAddr;
use tracing::{info, warn};

use crate::domain::Rejection;

/// Installs the Prometheus exporter on the given port.
pub fn init_metrics(port: u16) {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
        Err(e) => warn!("Prometheus exporter install failed: {}", e),
    }
}

/// Metrics for one venue's extraction pass.
pub struct ExtractionMetrics;

impl ExtractionMetrics {
    pub fn record_containers(venue: &str, containers: usize) {
        ::metrics::counter!("extract_containers_discovered_total", "venue" => venue.to_string())
            .increment(containers as u64);
    }

    pub fn record_candidates(venue: &str, html: usize, json_ld: usize) {
        ::metrics::counter!("extract_candidates_built_total", "venue" => venue.to_string(), "source" => "html")
            .increment(html as u64);
        ::metrics::counter!("extract_candidates_built_total", "venue" => venue.to_string(), "source" => "json_ld")
            .increment(json_ld as u64);
    }

    pub fn record_rejections(venue: &str, rejections: &[Rejection]) {
        for rejection in rejections {
            ::metrics::counter!(
                "extract_rejections_total",
                "venue" => venue.to_string(),
                "reason" => rejection.reason.label()
            )
            .increment(1);
        }
    }

    pub fn record_result(venue: &str, events: usize, duplicates: usize, duration_secs: f64) {
        ::metrics::counter!("extract_duplicates_removed_total", "venue" => venue.to_string())
            .increment(duplicates as u64);
        ::metrics::counter!("extract_events_emitted_total", "venue" => venue.to_string())
            .increment(events as u64);
        ::metrics::histogram!("extract_duration_seconds", "venue" => venue.to_string())
            .record(duration_secs);
    }

    pub fn record_fetch_error(venue: &str) {
        ::metrics::counter!("extract_fetch_errors_total", "venue" => venue.to_string()).increment(1);
    }
}
