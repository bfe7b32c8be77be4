//! Session runner: owns the acquisition and the reader loop.

use std::fmt;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{EngineConfig, PointGrid, StreamKind};
use device::MockDriver;
use observability::PublishStatsAggregator;
use serde::Serialize;
use sync_engine::{Acquisition, FrameReader};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::SessionStats;
use crate::error::CliError;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Engine configuration
    pub engine: EngineConfig,

    /// Stop after this many published pairs (None = unlimited)
    pub max_pairs: Option<u64>,

    /// Session timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxPairs,
    Timeout,
    Signal,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::MaxPairs => "pair limit",
            StopReason::Timeout => "timeout",
            StopReason::Signal => "shutdown signal",
        };
        f.write_str(text)
    }
}

/// One acquisition session over the simulated device
pub struct Session {
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Run until the pair limit, the timeout or a shutdown signal
    pub async fn run(self) -> Result<SessionStats> {
        let period = reader_period(self.config.engine.reader.fps)?;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Opening blocks until the first depth frame arrives.
        let engine_config = self.config.engine.clone();
        let acquisition = tokio::task::spawn_blocking(move || {
            let driver = MockDriver::new(engine_config.mock.clone());
            Acquisition::open(&engine_config, &driver)
        })
        .await
        .context("Device open task failed")?
        .map_err(|e| CliError::acquisition(e.to_string()))?;

        let bbox = acquisition.bounding_box();
        info!(bbox_min = ?bbox.min, bbox_max = ?bbox.max, "Device opened");

        acquisition
            .start()
            .map_err(|e| CliError::acquisition(e.to_string()))?;

        let reader = acquisition.reader();
        let mut aggregator = PublishStatsAggregator::new();
        let started = Instant::now();

        let reason = tokio::select! {
            _ = poll_reader(&reader, period, self.config.max_pairs, &mut aggregator) => StopReason::MaxPairs,
            _ = sleep_or_forever(self.config.timeout) => StopReason::Timeout,
            _ = shutdown_signal() => StopReason::Signal,
        };

        info!(reason = %reason, "Stopping acquisition");
        acquisition.stop();

        Ok(SessionStats {
            reason,
            duration: started.elapsed(),
            sync: acquisition.stats(),
            depth: acquisition.ingestion_metrics(StreamKind::Depth),
            color: acquisition.ingestion_metrics(StreamKind::Color),
            reader: aggregator.summary(),
        })
    }
}

/// Poll the published buffers at a fixed rate
///
/// Returns once `max_pairs` pairs have been published; never returns when
/// there is no limit.
async fn poll_reader(
    reader: &FrameReader,
    period: Duration,
    max_pairs: Option<u64>,
    aggregator: &mut PublishStatsAggregator,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let locked_at = Instant::now();
        let observed = {
            let guard = reader.lock();
            if guard.is_ready() {
                guard
                    .published_index()
                    .map(|index| (index, valid_ratio(guard.geometry())))
            } else {
                None
            }
        };
        let hold_ms = locked_at.elapsed().as_secs_f64() * 1000.0;

        match observed {
            Some((index, ratio)) => {
                debug!(index, valid_ratio = ratio, hold_ms, "pair read");
                aggregator.record_read(index, ratio, hold_ms);
            }
            None => aggregator.record_not_ready(),
        }

        if let Some(max) = max_pairs {
            if reader.published_count() >= max {
                return;
            }
        }
    }
}

/// Polling period for a reader rate
///
/// Rejects rates whose period is zero or does not fit a `Duration`.
fn reader_period(fps: f64) -> Result<Duration, CliError> {
    Duration::try_from_secs_f64(1.0 / fps)
        .ok()
        .filter(|period| !period.is_zero())
        .ok_or_else(|| {
            CliError::invalid_argument("reader.fps", format!("no usable polling period for {fps} Hz"))
        })
}

/// Fraction of points in the grid with a valid depth
fn valid_ratio(grid: &PointGrid) -> f64 {
    let total = grid.points().len();
    if total == 0 {
        return 0.0;
    }
    grid.valid_points().count() as f64 / total as f64
}

async fn sleep_or_forever(timeout: Option<Duration>) {
    match timeout {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
