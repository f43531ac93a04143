//! Bounded ring buffer of raw intensities.

use std::collections::VecDeque;

/// Fixed-capacity intensity buffer; the oldest value is evicted when full.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryBuffer {
    values: VecDeque<f64>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            // Capacities reach tens of thousands; grow on demand.
            values: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// A buffer pre-filled with the newest `capacity` entries of `values`.
    pub fn from_values(capacity: usize, values: &[f64]) -> Self {
        let mut buffer = Self::new(capacity);
        let skip = values.len().saturating_sub(capacity);
        buffer.values.extend(&values[skip..]);
        buffer
    }

    /// Append one value, evicting the oldest on overflow. O(1).
    pub fn push(&mut self, value: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    /// Contents in insertion order, oldest first.
    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
