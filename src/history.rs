//! Fixed-capacity ring buffer for rolling histories.
//!
//! Pitch, volume, segment, score and behavior histories all keep the most
//! recent N entries. Storage is allocated once; pushing past capacity
//! overwrites the oldest slot in place.

/// Bounded FIFO history. Oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<T>,
    capacity: usize,
    /// Index of the oldest entry once the buffer is full.
    head: usize,
}

impl<T> RingBuffer<T> {
    /// Creates an empty buffer holding at most `capacity` entries.
    ///
    /// A zero capacity is bumped to 1 so `push` always retains the latest value.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            head: 0,
        }
    }

    /// Appends a value, evicting the oldest one when full.
    pub fn push(&mut self, value: T) {
        if self.slots.len() < self.capacity {
            self.slots.push(value);
        } else {
            self.slots[self.head] = value;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    /// Most recently pushed entry.
    pub fn latest(&self) -> Option<&T> {
        if self.slots.is_empty() {
            None
        } else if self.is_full() {
            let idx = (self.head + self.capacity - 1) % self.capacity;
            self.slots.get(idx)
        } else {
            self.slots.last()
        }
    }

    /// Iterates over at most the `n` newest entries, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &T> + '_ {
        let skip = self.len().saturating_sub(n);
        self.iter().skip(skip)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }
}

impl RingBuffer<f32> {
    /// Arithmetic mean, or `None` when empty.
    pub fn mean(&self) -> Option<f32> {
        if self.slots.is_empty() {
            return None;
        }
        Some(self.slots.iter().sum::<f32>() / self.slots.len() as f32)
    }

    /// Population standard deviation around `mean`.
    pub fn std_dev(&self, mean: f32) -> f32 {
        if self.slots.is_empty() {
            return 0.0;
        }
        let variance = self
            .slots
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f32>()
            / self.slots.len() as f32;
        variance.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_below_capacity_keeps_order() {
        let mut buf = RingBuffer::new(3);
        buf.push(1);
        buf.push(2);
        assert_eq!(buf.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(buf.latest(), Some(&2));
        assert!(!buf.is_full());
    }

    #[test]
    fn test_push_past_capacity_evicts_oldest() {
        let mut buf = RingBuffer::new(3);
        for v in 1..=5 {
            buf.push(v);
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(buf.latest(), Some(&5));
    }

    #[test]
    fn test_storage_never_grows_beyond_capacity() {
        let mut buf = RingBuffer::new(4);
        for v in 0..1000 {
            buf.push(v);
        }
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.slots.capacity(), 4);
    }

    #[test]
    fn test_recent_returns_newest_entries() {
        let mut buf = RingBuffer::new(10);
        for v in 1..=7 {
            buf.push(v);
        }
        assert_eq!(buf.recent(3).copied().collect::<Vec<_>>(), vec![5, 6, 7]);
        assert_eq!(buf.recent(50).count(), 7);
    }

    #[test]
    fn test_zero_capacity_holds_latest() {
        let mut buf = RingBuffer::new(0);
        buf.push('a');
        buf.push('b');
        assert_eq!(buf.capacity(), 1);
        assert_eq!(buf.latest(), Some(&'b'));
    }

    #[test]
    fn test_mean_and_std_dev() {
        let mut buf = RingBuffer::new(4);
        for v in [2.0, 4.0, 4.0, 6.0] {
            buf.push(v);
        }
        let mean = buf.mean().unwrap();
        assert!((mean - 4.0).abs() < 1e-6);
        assert!((buf.std_dev(mean) - 2.0_f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_mean_of_empty_is_none() {
        let buf: RingBuffer<f32> = RingBuffer::new(4);
        assert_eq!(buf.mean(), None);
        assert_eq!(buf.std_dev(0.0), 0.0);
    }

    #[test]
    fn test_clear_resets() {
        let mut buf = RingBuffer::new(2);
        buf.push(1);
        buf.push(2);
        buf.push(3);
        buf.clear();
        assert!(buf.is_empty());
        buf.push(9);
        assert_eq!(buf.iter().copied().collect::<Vec<_>>(), vec![9]);
    }
}
