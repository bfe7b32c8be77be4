//! Index-based frame alignment.
//!
//! Pairs depth and color frames that share an index. Frames of one stream
//! that can no longer be matched (the other stream's head is already ahead)
//! are discarded from the head of their queue.

use std::cmp::Ordering;

use contracts::{Frame, StreamKind};
use observability::metrics as sync_metrics;
use tracing::{debug, trace};

use crate::queue::{PendingQueue, PushOutcome};

/// A depth and color frame with the same index
#[derive(Debug, Clone)]
pub struct MatchedPair {
    pub depth: Frame,
    pub color: Frame,
}

impl MatchedPair {
    pub fn index(&self) -> u64 {
        self.depth.index
    }
}

/// Indices discarded while searching for a match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrimReport {
    pub depth: Vec<u64>,
    pub color: Vec<u64>,
}

impl TrimReport {
    pub fn is_empty(&self) -> bool {
        self.depth.is_empty() && self.color.is_empty()
    }
}

/// Alignment state machine over the two pending queues
#[derive(Debug)]
pub struct FrameAligner {
    depth: PendingQueue,
    color: PendingQueue,
    depth_trimmed: u64,
    color_trimmed: u64,
}

impl FrameAligner {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            depth: PendingQueue::new(StreamKind::Depth, queue_capacity),
            color: PendingQueue::new(StreamKind::Color, queue_capacity),
            depth_trimmed: 0,
            color_trimmed: 0,
        }
    }

    /// Queue a frame on its stream's pending queue
    pub fn push(&mut self, frame: Frame) -> PushOutcome {
        let kind = frame.stream;
        let index = frame.index;
        let outcome = self.queue_mut(kind).push(frame);
        match outcome {
            PushOutcome::Accepted => trace!(stream = %kind, index, "frame queued"),
            PushOutcome::Evicted(evicted) => {
                sync_metrics::record_frames_discarded(kind.as_str(), 1);
                debug!(stream = %kind, index, evicted, "pending queue full, oldest frame evicted")
            }
            PushOutcome::OutOfOrder => {
                sync_metrics::record_out_of_order(kind.as_str());
                debug!(stream = %kind, index, "out-of-order frame rejected")
            }
        }
        outcome
    }

    /// Find the next matched pair
    ///
    /// Drops unmatched heads until both heads share an index or a queue runs
    /// empty. Returns `None` without touching anything if either queue is
    /// empty on entry.
    pub fn next_pair(&mut self) -> Option<MatchedPair> {
        let mut report = TrimReport::default();

        let matched = loop {
            let (Some(depth), Some(color)) = (self.depth.head_index(), self.color.head_index())
            else {
                break false;
            };
            match depth.cmp(&color) {
                Ordering::Less => {
                    self.depth.pop();
                    report.depth.push(depth);
                }
                Ordering::Greater => {
                    self.color.pop();
                    report.color.push(color);
                }
                Ordering::Equal => break true,
            }
        };

        if !report.is_empty() {
            self.depth_trimmed += report.depth.len() as u64;
            self.color_trimmed += report.color.len() as u64;
            sync_metrics::record_frames_discarded("depth", report.depth.len() as u64);
            sync_metrics::record_frames_discarded("color", report.color.len() as u64);
            debug!(
                depth_dropped = ?report.depth,
                color_dropped = ?report.color,
                "discarded unmatched frames"
            );
        }

        if !matched {
            return None;
        }
        let depth = self.depth.pop()?;
        let color = self.color.pop()?;
        Some(MatchedPair { depth, color })
    }

    pub fn queue(&self, kind: StreamKind) -> &PendingQueue {
        match kind {
            StreamKind::Depth => &self.depth,
            StreamKind::Color => &self.color,
        }
    }

    fn queue_mut(&mut self, kind: StreamKind) -> &mut PendingQueue {
        match kind {
            StreamKind::Depth => &mut self.depth,
            StreamKind::Color => &mut self.color,
        }
    }

    /// Frames of `kind` discarded without being published
    ///
    /// Counts both unmatched heads and queue evictions.
    pub fn dropped(&self, kind: StreamKind) -> u64 {
        let trimmed = match kind {
            StreamKind::Depth => self.depth_trimmed,
            StreamKind::Color => self.color_trimmed,
        };
        trimmed + self.queue(kind).evicted_count()
    }

    /// Out-of-order frames rejected on either stream
    pub fn out_of_order(&self) -> u64 {
        self.depth.out_of_order_count() + self.color.out_of_order_count()
    }
}
