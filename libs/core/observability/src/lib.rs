//! Prometheus metrics for the schedule service.
//!
//! - recorder installation and the `/metrics` handler
//! - [`ScheduleMetrics`] for merges, deletes, imports and exports
//! - Axum middleware for request metrics
//!
//! ```rust,ignore
//! use observability::{init_metrics, metrics_handler, middleware::metrics_middleware};
//!
//! init_metrics()?;
//!
//! let app = Router::new()
//!     .route("/metrics", get(metrics_handler))
//!     .layer(axum::middleware::from_fn(metrics_middleware));
//! ```

pub mod middleware;
pub mod schedule;

pub use middleware::metrics_middleware;
pub use schedule::ScheduleMetrics;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder once; later calls return the same handle.
pub fn init_metrics() -> Result<&'static PrometheusHandle, BuildError> {
    METRICS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;
        info!("Prometheus metrics recorder initialized");
        register_metric_descriptions();
        Ok(handle)
    })
}

pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Axum handler for `/metrics`
pub async fn metrics_handler() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

fn register_metric_descriptions() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!("http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "http_requests_errors_total",
        "Total number of HTTP request errors"
    );

    describe_counter!(
        "schedule_merges_total",
        "Merges of events, locations and tags by outcome (created/updated)"
    );
    describe_counter!(
        "schedule_deletes_total",
        "Deleted events, locations and tags"
    );
    describe_counter!(
        "schedule_import_rows_total",
        "CSV import rows by outcome (created/updated/skipped)"
    );
    describe_histogram!(
        "schedule_import_duration_seconds",
        "CSV import duration in seconds"
    );
    describe_counter!("schedule_exports_total", "CSV exports of party schedules");
}
