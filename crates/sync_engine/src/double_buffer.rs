//! Two-slot buffer with an atomic front selector.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::exchange::ExchangeState;

/// Front/back pair of preallocated buffers
///
/// The writer fills the back slot, then swaps roles with [`flip`]. Flipping
/// and reading the front both require a borrow of the exchange state, which
/// only exists while the exchange lock is held.
///
/// [`flip`]: DoubleBuffer::flip
#[derive(Debug)]
pub struct DoubleBuffer<T> {
    slots: [Mutex<T>; 2],
    front: AtomicUsize,
}

impl<T: Clone> DoubleBuffer<T> {
    /// Both slots start as copies of `initial`
    pub fn new(initial: T) -> Self {
        Self {
            slots: [Mutex::new(initial.clone()), Mutex::new(initial)],
            front: AtomicUsize::new(0),
        }
    }
}

impl<T> DoubleBuffer<T> {
    /// Slot currently shown to readers
    pub fn front_slot(&self) -> usize {
        self.front.load(Ordering::Acquire)
    }

    /// Lock the back slot for writing
    ///
    /// Only the single writer calls this, so the front cannot move while the
    /// guard is alive.
    pub(crate) fn lock_back(&self) -> MutexGuard<'_, T> {
        let back = 1 - self.front_slot();
        self.slots[back]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the front slot for reading
    pub(crate) fn lock_front(&self, _held: &ExchangeState) -> MutexGuard<'_, T> {
        self.slots[self.front_slot()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Swap front and back
    pub(crate) fn flip(&self, _held: &ExchangeState) {
        self.front.fetch_xor(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_swaps_slots() {
        let state = ExchangeState::new();
        let buffer = DoubleBuffer::new(0u32);

        *buffer.lock_back() = 7;
        assert_eq!(*buffer.lock_front(&state), 0);

        buffer.flip(&state);
        assert_eq!(buffer.front_slot(), 1);
        assert_eq!(*buffer.lock_front(&state), 7);
        assert_eq!(*buffer.lock_back(), 0);

        buffer.flip(&state);
        assert_eq!(buffer.front_slot(), 0);
    }
}
