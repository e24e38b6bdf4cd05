//! Bounded history of raw inbound frames.
//!
//! The receive loop appends every frame before parsing it. When the
//! buffer is full the oldest frame is evicted. A capacity of zero disables
//! recording.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

// ============================================================================
// History
// ============================================================================

/// Ring buffer of raw frames, shared between the receive loop and readers.
#[derive(Debug, Clone)]
pub struct History {
    frames: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl History {
    /// Creates an empty history holding at most `capacity` frames.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(64)))),
            capacity,
        }
    }

    /// Appends a frame, evicting the oldest if full.
    pub fn push(&self, frame: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }

        let mut frames = self.frames.lock();
        if frames.len() == self.capacity {
            frames.pop_front();
        }
        frames.push_back(frame.into());
    }

    /// Returns the retained frames, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.frames.lock().iter().cloned().collect()
    }

    /// Returns the number of retained frames.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    /// Returns `true` if no frame is retained.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    /// Returns the maximum number of retained frames.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops all retained frames.
    pub fn clear(&self) {
        self.frames.lock().clear();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest() {
        let history = History::new(2);
        history.push("a");
        history.push("b");
        history.push("c");

        assert_eq!(history.snapshot(), vec!["b", "c"]);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_zero_capacity_records_nothing() {
        let history = History::new(0);
        history.push("a");
        assert!(history.is_empty());
    }

    #[test]
    fn test_clear() {
        let history = History::new(4);
        history.push("a");
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 4);
    }
}
