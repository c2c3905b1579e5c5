//! Fixed-window moving average.
//!
//! Ring buffer of the last `N` samples, stack allocated.  The average
//! of an empty window is `0.0`.

/// Arithmetic mean over the last `N` samples.
#[derive(Debug, Clone)]
pub struct MovingAverage<const N: usize> {
    ring: [f32; N],
    head: usize,
    count: usize,
}

impl<const N: usize> Default for MovingAverage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> MovingAverage<N> {
    pub const fn new() -> Self {
        Self {
            ring: [0.0; N],
            head: 0,
            count: 0,
        }
    }

    /// Append a sample, evicting the oldest once the window is full.
    pub fn add_value(&mut self, value: f32) {
        if N == 0 {
            return;
        }
        self.ring[self.head] = value;
        self.head = (self.head + 1) % N;
        if self.count < N {
            self.count += 1;
        }
    }

    /// Mean of the samples currently held, `0.0` when empty.
    pub fn average(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        let sum: f32 = self.ring[..self.count].iter().sum();
        sum / self.count as f32
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.count = 0;
    }
}
