#![forbid(unsafe_code)]

use std::collections::VecDeque;

/// Fixed-capacity sample buffer for one series, newest sample first.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesWindow {
    capacity: usize,
    samples: VecDeque<f64>,
}

impl SeriesWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            samples: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Inserts `value` as the newest sample, evicting the oldest one when full.
    pub fn push_front(&mut self, value: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_back();
        }
        self.samples.push_front(value);
    }

    pub fn newest(&self) -> Option<f64> {
        self.samples.front().copied()
    }

    pub fn oldest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }
}
