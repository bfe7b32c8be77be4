//! Backpressure configuration and metrics

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::IngestionConfig;
pub use contracts::DropPolicy;

/// Backpressure configuration
#[derive(Debug, Clone)]
pub struct BackpressureConfig {
    /// Channel capacity
    pub channel_capacity: usize,

    /// Drop policy when full
    pub drop_policy: DropPolicy,
}

impl Default for BackpressureConfig {
    fn default() -> Self {
        IngestionConfig::default().into()
    }
}

impl BackpressureConfig {
    /// Create new backpressure configuration
    pub fn new(channel_capacity: usize, drop_policy: DropPolicy) -> Self {
        Self {
            channel_capacity,
            drop_policy,
        }
    }
}

impl From<IngestionConfig> for BackpressureConfig {
    fn from(config: IngestionConfig) -> Self {
        Self::new(config.channel_capacity, config.drop_policy)
    }
}

/// Per-stream ingestion metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Frames fetched and handed to the channel
    pub frames_received: AtomicU64,

    /// Frames discarded by the drop policy
    pub frames_dropped: AtomicU64,

    /// Notifications whose fetch failed (duplicates are not counted)
    pub fetch_failures: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record frame received
    pub fn record_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record frame dropped
    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record fetch failure
    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Frames fetched and handed to the channel
    pub frames_received: u64,

    /// Frames discarded by the drop policy
    pub frames_dropped: u64,

    /// Notifications whose fetch failed (duplicates are not counted)
    pub fetch_failures: u64,
}
