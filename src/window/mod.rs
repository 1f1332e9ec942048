// Rolling statistics window

use std::collections::VecDeque;


/// Default number of samples kept per entity
pub const DEFAULT_WINDOW_CAPACITY: usize = 100;

/// Fixed-capacity FIFO of recent samples for one entity.
///
/// Once full, every append evicts the oldest sample so `len() == capacity()`
/// holds for the rest of the window's life. Mean and standard deviation do
/// not depend on sample order; order only decides which sample is evicted.
#[derive(Clone, Debug)]
pub struct RollingWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl RollingWindow {
    /// Create an empty window. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
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

    /// True once warm-up is over
    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    /// Append a sample, evicting the oldest one if the window is full.
    ///
    /// Returns the evicted sample, if any.
    pub fn append(&mut self, value: f64) -> Option<f64> {
        let evicted = if self.is_full() {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(value);
        evicted
    }

    /// Arithmetic mean, `None` while empty.
    ///
    /// Accumulated as offsets from the oldest sample, so a window of
    /// identical samples has exactly that sample as its mean and exactly
    /// zero deviation, whether or not the value is representable in binary.
    pub fn mean(&self) -> Option<f64> {
        let first = *self.samples.front()?;
        let offset: f64 = self.samples.iter().map(|v| v - first).sum();
        Some(first + offset / self.samples.len() as f64)
    }

    /// Sample standard deviation (N-1 denominator).
    ///
    /// `None` with fewer than two samples: statistics are unavailable.
    pub fn stddev(&self) -> Option<f64> {
        let n = self.samples.len();
        if n < 2 {
            return None;
        }
        let mean = self.mean()?;
        let sum_sq: f64 = self
            .samples
            .iter()
            .map(|v| {
                let d = v - mean;
                d * d
            })
            .sum();
        Some((sum_sq / (n - 1) as f64).sqrt())
    }

    /// Samples from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}
