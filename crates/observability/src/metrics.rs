//! Depth sync metrics
//!
//! Prometheus recording helpers for the synchronizer, plus in-memory
//! aggregation of what a reader observed during a run.

use metrics::{counter, gauge, histogram};

/// Record a published pair
///
/// Called by the synchronizer after each flip.
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_pair_published;
///
/// let started = Instant::now();
/// exchange.publish_with(index, fill)?;
/// record_pair_published(index, started.elapsed().as_secs_f64() * 1000.0);
/// ```
pub fn record_pair_published(index: u64, conversion_ms: f64) {
    counter!("depth_sync_pairs_published_total").increment(1);

    // Published index (used to detect stalls)
    gauge!("depth_sync_last_published_index").set(index as f64);

    histogram!("depth_sync_conversion_ms").record(conversion_ms);
}

/// Record a matched pair that did not fit the buffers
pub fn record_pair_rejected() {
    counter!("depth_sync_pairs_rejected_total").increment(1);
}

/// Record frames discarded by the synchronizer (unmatched or evicted)
pub fn record_frames_discarded(stream: &'static str, count: u64) {
    counter!("depth_sync_frames_discarded_total", "stream" => stream).increment(count);
}

/// Record an out-of-order frame
pub fn record_out_of_order(stream: &'static str) {
    counter!("depth_sync_frames_out_of_order_total", "stream" => stream).increment(1);
}

/// Record pending queue depth
pub fn record_queue_depth(stream: &'static str, depth: usize) {
    gauge!("depth_sync_queue_depth", "stream" => stream).set(depth as f64);
}

/// Reader-side aggregator
///
/// Fed by the reader loop on every poll; summarizes how fresh and how
/// complete the published pairs were.
#[derive(Debug, Clone, Default)]
pub struct PublishStatsAggregator {
    /// Reader polls
    pub total_reads: u64,

    /// Polls that found the engine not ready yet
    pub not_ready_reads: u64,

    /// Distinct published pairs observed
    pub pairs_observed: u64,

    /// Polls that saw the same pair as the previous poll
    pub repeated_reads: u64,

    /// Indices skipped between consecutively observed pairs
    ///
    /// Counts every skipped index, including indices that were never
    /// published (for example when one stream runs at half rate).
    pub index_gaps: u64,

    /// Fraction of valid points per observed pair
    pub valid_ratio: RunningStats,

    /// Time the read guard was held (ms)
    pub hold_ms: RunningStats,

    last_index: Option<u64>,
}

impl PublishStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a poll that found nothing published
    pub fn record_not_ready(&mut self) {
        self.total_reads += 1;
        self.not_ready_reads += 1;
    }

    /// Record a poll of pair `index`
    pub fn record_read(&mut self, index: u64, valid_ratio: f64, hold_ms: f64) {
        self.total_reads += 1;
        self.hold_ms.push(hold_ms);

        match self.last_index {
            Some(last) if index == last => {
                self.repeated_reads += 1;
                return;
            }
            Some(last) if index > last => {
                self.index_gaps += index - last - 1;
            }
            _ => {}
        }
        self.last_index = Some(index);
        self.pairs_observed += 1;
        self.valid_ratio.push(valid_ratio);
    }

    /// Index of the last observed pair
    pub fn last_index(&self) -> Option<u64> {
        self.last_index
    }

    /// Generate summary report
    pub fn summary(&self) -> PublishSummary {
        PublishSummary {
            total_reads: self.total_reads,
            not_ready_reads: self.not_ready_reads,
            pairs_observed: self.pairs_observed,
            repeated_reads: self.repeated_reads,
            index_gaps: self.index_gaps,
            last_index: self.last_index,
            valid_ratio: StatsSummary::from(&self.valid_ratio),
            hold_ms: StatsSummary::from(&self.hold_ms),
        }
    }

    /// Reset statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Reader-side summary
#[derive(Debug, Clone, Default)]
pub struct PublishSummary {
    pub total_reads: u64,
    pub not_ready_reads: u64,
    pub pairs_observed: u64,
    pub repeated_reads: u64,
    pub index_gaps: u64,
    pub last_index: Option<u64>,
    pub valid_ratio: StatsSummary,
    pub hold_ms: StatsSummary,
}

impl std::fmt::Display for PublishSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Reader Summary ===")?;
        writeln!(f, "Reads: {}", self.total_reads)?;
        writeln!(f, "Not ready: {}", self.not_ready_reads)?;
        writeln!(f, "Pairs observed: {}", self.pairs_observed)?;
        writeln!(f, "Repeated reads: {}", self.repeated_reads)?;
        writeln!(f, "Index gaps: {}", self.index_gaps)?;
        match self.last_index {
            Some(index) => writeln!(f, "Last index: {}", index)?,
            None => writeln!(f, "Last index: N/A")?,
        }
        writeln!(f, "Valid point ratio: {}", self.valid_ratio)?;
        writeln!(f, "Guard hold (ms): {}", self.hold_ms)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
