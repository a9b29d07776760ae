//! Ring Buffer Implementation

use serde::Serialize;
use std::collections::VecDeque;

/// Upper bound on the up-front allocation
const PREALLOCATE_LIMIT: usize = 1000;

/// Bounded, oldest-first history.
///
/// Owned by a single writer; readers borrow it or take clones of the tail.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct RingBuffer<T> {
    /// Stored entries, oldest at the front
    entries: VecDeque<T>,
    /// Maximum number of retained entries
    #[serde(skip)]
    capacity: usize,
    /// Total entries ever pushed (for statistics)
    #[serde(skip)]
    total_written: usize,
}

impl<T> RingBuffer<T> {
    /// Create a new ring buffer with given capacity (at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(PREALLOCATE_LIMIT)),
            capacity,
            total_written: 0,
        }
    }

    /// Push an entry, evicting the oldest if full. Returns the evicted entry.
    pub fn push(&mut self, entry: T) -> Option<T> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        self.total_written += 1;
        evicted
    }

    /// Number of entries currently retained
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent entry
    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Iterate mutably, oldest to newest
    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut T> + ExactSizeIterator {
        self.entries.iter_mut()
    }

    /// Iterate over the last `count` entries, oldest to newest
    pub fn tail(&self, count: usize) -> impl Iterator<Item = &T> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(skip)
    }

    /// Get total entries ever pushed (for statistics)
    pub fn total_written(&self) -> usize {
        self.total_written
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Clone the last `count` entries, oldest to newest
    pub fn read_last(&self, count: usize) -> Vec<T> {
        self.tail(count).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_push_and_read() {
        let mut buffer = RingBuffer::new(10);

        for i in 0..5 {
            buffer.push(i * 100);
        }

        assert_eq!(buffer.len(), 5);

        let tail = buffer.read_last(3);
        assert_eq!(tail, vec![200, 300, 400]);
        assert_eq!(buffer.latest(), Some(&400));
    }

    #[test]
    fn test_overwrite_oldest() {
        let mut buffer = RingBuffer::new(5);

        let mut evicted = Vec::new();
        for i in 0..10 {
            if let Some(old) = buffer.push(i) {
                evicted.push(old);
            }
        }

        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.len(), buffer.capacity());
        assert_eq!(evicted, vec![0, 1, 2, 3, 4]);
        assert_eq!(buffer.read_last(10), vec![5, 6, 7, 8, 9]);
        assert_eq!(buffer.total_written(), 10);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut buffer = RingBuffer::new(0);
        buffer.push("a");
        buffer.push("b");
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.read_last(5), vec!["b"]);
    }

    #[test]
    fn test_serializes_as_sequence() {
        let mut buffer = RingBuffer::new(2);
        buffer.push(1);
        buffer.push(2);
        buffer.push(3);
        assert_eq!(serde_json::to_string(&buffer).unwrap(), "[2,3]");
    }

    proptest! {
        #[test]
        fn prop_len_never_exceeds_capacity(capacity in 1usize..64, pushes in 0usize..256) {
            let mut buffer = RingBuffer::new(capacity);
            for i in 0..pushes {
                buffer.push(i);
            }
            prop_assert_eq!(buffer.len(), pushes.min(capacity));
            if pushes > 0 {
                prop_assert_eq!(buffer.latest(), Some(&(pushes - 1)));
            }
        }
    }
}
