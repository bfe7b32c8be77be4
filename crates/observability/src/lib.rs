//! # Observability
//!
//! Prometheus export and synchronizer metrics. Log output is configured by
//! the binary; this crate only emits through `tracing`.
//!
//! ## Usage Example
//!
//! ```ignore
//! observability::init_metrics_only(9000)?;
//!
//! observability::record_pair_published(index, conversion_ms);
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;

// Re-exports
pub use crate::metrics::{
    record_frames_discarded, record_out_of_order, record_pair_published, record_pair_rejected,
    record_queue_depth, PublishStatsAggregator, PublishSummary, RunningStats, StatsSummary,
};

/// Install the Prometheus recorder with an HTTP listener on `port`
///
/// Fails when a global recorder is already installed or the listener
/// cannot be bound.
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}
