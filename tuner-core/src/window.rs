//! # Sliding Sample Window
//!
//! Fixed-capacity FIFO of normalized samples. The window grows until it holds
//! `capacity` samples and from then on shifts left by the length of every new
//! block, so it always reflects the most recent second of audio.

#[derive(Debug, Clone)]
pub struct SlidingWindow {
    samples: Vec<f32>,
    capacity: usize,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a block, discarding the oldest samples once at capacity.
    ///
    /// A block longer than the capacity replaces the whole window with its
    /// most recent `capacity` samples.
    pub fn push(&mut self, block: &[f32]) {
        let block = if block.len() > self.capacity {
            &block[block.len() - self.capacity..]
        } else {
            block
        };

        let overflow = (self.samples.len() + block.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            // Shift left in place and reuse the freed tail.
            self.samples.copy_within(overflow.., 0);
            self.samples.truncate(self.samples.len() - overflow);
        }
        self.samples.extend_from_slice(block);
    }

    /// The samples currently held, oldest first.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True once the window holds exactly `capacity` samples.
    pub fn is_primed(&self) -> bool {
        self.samples.len() == self.capacity
    }

    /// Mean of the squared samples over the full capacity.
    ///
    /// Samples not yet received count as silence.
    pub fn signal_power(&self) -> f32 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.samples.iter().map(|&s| s * s).sum::<f32>() / self.capacity as f32
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
