//! Per-stream pending frame queue.
//!
//! Bounded FIFO backed by a `HeapRb`. Indices strictly increase from head to
//! tail; a late or duplicate frame is rejected.

use std::fmt;

use contracts::{Frame, StreamKind};
use ringbuf::{traits::*, HeapRb};

/// Result of pushing a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Appended at the tail
    Accepted,
    /// Appended after evicting the head with the given index
    Evicted(u64),
    /// Index not greater than the last accepted one
    OutOfOrder,
}

/// Pending frames of one stream
pub struct PendingQueue {
    kind: StreamKind,
    ring: HeapRb<Frame>,
    capacity: usize,
    last_index: Option<u64>,
    evicted_count: u64,
    out_of_order_count: u64,
}

impl fmt::Debug for PendingQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingQueue")
            .field("kind", &self.kind)
            .field("len", &self.ring.occupied_len())
            .field("capacity", &self.capacity)
            .field("head", &self.head_index())
            .finish()
    }
}

impl PendingQueue {
    pub fn new(kind: StreamKind, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            kind,
            ring: HeapRb::new(capacity),
            capacity,
            last_index: None,
            evicted_count: 0,
            out_of_order_count: 0,
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Push a frame at the tail
    ///
    /// If the queue is full, the oldest frame is evicted first.
    #[inline]
    pub fn push(&mut self, frame: Frame) -> PushOutcome {
        if let Some(last) = self.last_index {
            if frame.index <= last {
                self.out_of_order_count += 1;
                return PushOutcome::OutOfOrder;
            }
        }
        self.last_index = Some(frame.index);

        let mut outcome = PushOutcome::Accepted;
        if self.ring.is_full() {
            if let Some(oldest) = self.ring.try_pop() {
                self.evicted_count += 1;
                outcome = PushOutcome::Evicted(oldest.index);
            }
        }
        let _ = self.ring.try_push(frame);
        outcome
    }

    /// Index of the oldest pending frame
    #[inline]
    pub fn head_index(&self) -> Option<u64> {
        self.ring.iter().next().map(|f| f.index)
    }

    /// Remove and return the oldest pending frame
    #[inline]
    pub fn pop(&mut self) -> Option<Frame> {
        self.ring.try_pop()
    }

    /// Pending indices, head first
    pub fn indices(&self) -> Vec<u64> {
        self.ring.iter().map(|f| f.index).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ring.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames evicted because the queue was full
    pub fn evicted_count(&self) -> u64 {
        self.evicted_count
    }

    /// Frames rejected for arriving out of order
    pub fn out_of_order_count(&self) -> u64 {
        self.out_of_order_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: u64) -> Frame {
        Frame::color(index, 1, 1, vec![0u8; 3])
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = PendingQueue::new(StreamKind::Color, 4);
        for i in [3, 5, 9] {
            assert_eq!(queue.push(frame(i)), PushOutcome::Accepted);
        }
        assert_eq!(queue.head_index(), Some(3));
        assert_eq!(queue.pop().map(|f| f.index), Some(3));
        assert_eq!(queue.indices(), vec![5, 9]);
    }

    #[test]
    fn test_rejects_out_of_order() {
        let mut queue = PendingQueue::new(StreamKind::Depth, 4);
        queue.push(frame(5));
        assert_eq!(queue.push(frame(5)), PushOutcome::OutOfOrder);
        assert_eq!(queue.push(frame(2)), PushOutcome::OutOfOrder);
        assert_eq!(queue.out_of_order_count(), 2);

        // Still rejected once the tail has been consumed.
        queue.pop();
        assert_eq!(queue.push(frame(4)), PushOutcome::OutOfOrder);
        assert_eq!(queue.push(frame(6)), PushOutcome::Accepted);
    }

    #[test]
    fn test_full_queue_evicts_oldest() {
        let mut queue = PendingQueue::new(StreamKind::Depth, 2);
        queue.push(frame(1));
        queue.push(frame(2));
        assert_eq!(queue.push(frame(3)), PushOutcome::Evicted(1));
        assert_eq!(queue.indices(), vec![2, 3]);
        assert_eq!(queue.evicted_count(), 1);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut queue = PendingQueue::new(StreamKind::Depth, 0);
        assert_eq!(queue.capacity(), 1);
        queue.push(frame(1));
        assert_eq!(queue.push(frame(2)), PushOutcome::Evicted(1));
    }
}
