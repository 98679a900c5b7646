use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::shared::constants::FRAME_BUFFER_CAPACITY;
use crate::shared::frame::Frame;

/// Fixed-capacity FIFO that drops its oldest entry instead of blocking.
///
/// The producer never waits on the consumer: a full buffer evicts the
/// least-recently inserted item before accepting the new one. `pop` is a
/// non-blocking poll.
pub struct BoundedBuffer<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
}

/// The buffer between the production thread and the display loop.
pub type FrameBuffer = BoundedBuffer<Frame>;

impl<T> BoundedBuffer<T> {
    /// Creates a buffer; a zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Inserts `item`, returning the evicted oldest entry if the buffer was full.
    pub fn push(&self, item: T) -> Option<T> {
        let mut items = self.lock();
        let evicted = if items.len() >= self.capacity {
            items.pop_front()
        } else {
            None
        };
        items.push_back(item);
        evicted
    }

    /// Removes and returns the oldest entry, or `None` when empty.
    pub fn pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        // A panic while holding the lock cannot leave the deque half-updated.
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for BoundedBuffer<T> {
    fn default() -> Self {
        Self::new(FRAME_BUFFER_CAPACITY)
    }
}
