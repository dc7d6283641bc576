//! Bounded ring buffer for sparkline history.
//!
//! Fixed-capacity circular buffer over a preallocated slot vector. A push
//! writes one slot and advances the head index, so evicting the oldest
//! sample is O(1) and nothing allocates once the buffer is full.

/// A fixed-capacity ring buffer.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<T>,
    /// Index of the next write.
    head: usize,
    len: usize,
    capacity: usize,
}

impl<T: Clone + Default> RingBuffer<T> {
    /// Creates a new ring buffer with the specified capacity.
    ///
    /// # Panics
    ///
    /// Panics if capacity is 0.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Ring buffer capacity must be greater than 0");
        Self {
            slots: vec![T::default(); capacity],
            head: 0,
            len: 0,
            capacity,
        }
    }
}

impl<T> RingBuffer<T> {
    /// Pushes a value, overwriting the oldest one once full.
    pub fn push(&mut self, value: T) {
        self.slots[self.head] = value;
        self.head = (self.head + 1) % self.capacity;
        if self.len < self.capacity {
            self.len += 1;
        }
    }

    /// Returns the most recent value, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        let idx = (self.head + self.capacity - 1) % self.capacity;
        Some(&self.slots[idx])
    }

    /// Returns the oldest value, if any.
    #[must_use]
    pub fn oldest(&self) -> Option<&T> {
        if self.len == 0 {
            None
        } else {
            Some(&self.slots[self.start()])
        }
    }

    /// Returns the current number of elements in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if the buffer is at capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// Returns the maximum capacity of the buffer.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let start = self.start();
        (0..self.len).map(move |i| &self.slots[(start + i) % self.capacity])
    }

    /// Forgets every sample, keeping the allocation.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    fn start(&self) -> usize {
        (self.head + self.capacity - self.len) % self.capacity
    }
}
