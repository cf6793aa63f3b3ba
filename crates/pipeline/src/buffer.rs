//! Bounded FIFO of raw channel samples

use std::collections::VecDeque;

use vitals_types::DEFAULT_BUFFER_LENGTH;

/// Holds the most recent `max_length` samples of one channel.
///
/// Pushing past the bound evicts exactly one sample, the oldest.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: VecDeque<f64>,
    max_length: usize,
    /// Logical index of the next sample to be pushed
    total_pushed: u64,
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_LENGTH)
    }
}

impl SampleBuffer {
    /// A `max_length` of zero is treated as one.
    pub fn new(max_length: usize) -> Self {
        let max_length = max_length.max(1);
        Self {
            samples: VecDeque::with_capacity(max_length + 1),
            max_length,
            total_pushed: 0,
        }
    }

    pub fn push(&mut self, sample: f64) {
        self.samples.push_back(sample);
        if self.samples.len() > self.max_length {
            self.samples.pop_front();
        }
        self.total_pushed += 1;
    }

    /// Owned copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.total_pushed = 0;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn last(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    /// Number of samples pushed since creation or the last `clear`.
    pub fn total_pushed(&self) -> u64 {
        self.total_pushed
    }

    /// Logical index of the oldest held sample.
    pub fn first_index(&self) -> u64 {
        self.total_pushed - self.samples.len() as u64
    }

    /// Implicit timestamps in seconds of the held samples.
    pub fn time_axis(&self, sampling_rate_hz: f64) -> Vec<f64> {
        if sampling_rate_hz <= 0.0 {
            return vec![0.0; self.samples.len()];
        }
        let first = self.first_index();
        (0..self.samples.len() as u64)
            .map(|i| (first + i) as f64 / sampling_rate_hz)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_eviction_keeps_last_values() {
        let mut buf = SampleBuffer::new(300);
        for i in 1..=500 {
            buf.push(i as f64);
        }
        let snap = buf.snapshot();
        assert_eq!(snap.len(), 300);
        // The 201st pushed value is the oldest survivor.
        assert_eq!(snap[0], 201.0);
        assert_eq!(snap[299], 500.0);
        assert!(snap.windows(2).all(|w| w[1] == w[0] + 1.0));
    }

    #[test]
    fn test_single_eviction_per_push() {
        let mut buf = SampleBuffer::new(3);
        for v in [1.0, 2.0, 3.0] {
            buf.push(v);
        }
        buf.push(4.0);
        assert_eq!(buf.snapshot(), vec![2.0, 3.0, 4.0]);
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_clear_resets_index() {
        let mut buf = SampleBuffer::new(4);
        for v in 0..10 {
            buf.push(v as f64);
        }
        assert_eq!(buf.first_index(), 6);
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.total_pushed(), 0);
        buf.push(1.0);
        assert_eq!(buf.time_axis(30.0), vec![0.0]);
    }

    #[test]
    fn test_time_axis_follows_logical_index() {
        let mut buf = SampleBuffer::new(2);
        for v in 0..5 {
            buf.push(v as f64);
        }
        assert_eq!(buf.time_axis(2.0), vec![1.5, 2.0]);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut buf = SampleBuffer::new(0);
        buf.push(1.0);
        buf.push(2.0);
        assert_eq!(buf.snapshot(), vec![2.0]);
        assert_eq!(buf.last(), Some(2.0));
    }
}
