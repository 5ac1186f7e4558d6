//! Observability utilities for the pricing services.
//!
//! This crate provides:
//! - Prometheus metrics recording and export
//! - Pricing metrics for provider fetches, selection and sync runs
//! - Axum middleware for automatic request metrics
//!
//! # Example
//!
//! ```rust,ignore
//! use observability::{init_metrics, metrics_handler, PricingMetrics};
//!
//! init_metrics();
//! PricingMetrics::record_provider_fetch("AWS", 42, 1.3);
//!
//! let app = Router::new()
//!     .route("/metrics", get(metrics_handler));
//! ```

pub mod middleware;
pub mod pricing;

pub use middleware::metrics_middleware;
pub use pricing::{PricingMetrics, PricingTimer};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::{error, info};

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize the Prometheus metrics recorder.
///
/// Safe to call more than once; only the first call installs the recorder.
/// If a global recorder is already installed elsewhere, the returned handle
/// renders an empty registry.
pub fn init_metrics() -> &'static PrometheusHandle {
    METRICS_HANDLE.get_or_init(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("Prometheus metrics recorder initialized");
            register_metric_descriptions();
            handle
        }
        Err(e) => {
            error!(error = %e, "Failed to install Prometheus recorder");
            PrometheusBuilder::new().build_recorder().handle()
        }
    })
}

/// Get the metrics handle (must call init_metrics first)
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Axum handler for /metrics endpoint
pub async fn metrics_handler() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

fn register_metric_descriptions() {
    use metrics::describe_counter;
    use metrics::describe_gauge;
    use metrics::describe_histogram;

    // HTTP metrics
    describe_counter!("http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "http_requests_errors_total",
        "Total number of HTTP request errors"
    );

    // Provider metrics
    describe_counter!(
        "pricing_provider_fetches_total",
        "Provider fetches by provider and outcome"
    );
    describe_histogram!(
        "pricing_provider_fetch_duration_seconds",
        "Provider fetch duration in seconds"
    );
    describe_gauge!(
        "pricing_provider_plans",
        "Plans returned by the last fetch of each provider"
    );

    // Aggregation and selection
    describe_histogram!(
        "pricing_aggregation_duration_seconds",
        "Live aggregation duration in seconds"
    );
    describe_counter!(
        "pricing_requests_total",
        "Pricing requests served by plan source"
    );
    describe_histogram!(
        "pricing_operation_duration_seconds",
        "Pricing operation duration in seconds"
    );
    describe_counter!(
        "pricing_selections_total",
        "Recommendation selections by policy"
    );
    describe_gauge!(
        "pricing_recommended_plans",
        "Plans recommended by the last selection"
    );

    // Sync
    describe_counter!("pricing_sync_runs_total", "Sync runs by status");
    describe_histogram!(
        "pricing_sync_duration_seconds",
        "Sync run duration in seconds"
    );
    describe_gauge!(
        "pricing_plans_synced_last_run",
        "Plans inserted by the last sync run"
    );
}
