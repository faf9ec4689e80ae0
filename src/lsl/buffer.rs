//! Ring buffer of timestamped multi-channel samples
//!
//! One buffer backs one stream reader. The outlet's producer pushes whole
//! chunks, the reader pulls trailing windows; both sides go through a
//! `parking_lot` mutex held only for the copy.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::lsl::info::{Chunk, Window};

/// Bounded history of samples; oldest samples are dropped on overflow
pub struct RingBuffer {
    capacity: usize,
    timestamps: VecDeque<f64>,
    /// One queue per channel, all the same length as `timestamps`
    channels: Vec<VecDeque<f64>>,
    /// Samples pushed since the last pull, capped at `capacity`
    n_new: usize,
    overflow_count: u64,
    out_of_order_count: u64,
    samples_pushed: u64,
}

impl RingBuffer {
    /// Create a buffer holding up to `capacity` samples of `n_channels` channels.
    ///
    /// Storage grows as samples arrive; nothing is reserved up front.
    pub fn new(capacity: usize, n_channels: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            timestamps: VecDeque::new(),
            channels: (0..n_channels).map(|_| VecDeque::new()).collect(),
            n_new: 0,
            overflow_count: 0,
            out_of_order_count: 0,
            samples_pushed: 0,
        }
    }

    /// Append a chunk sample by sample.
    ///
    /// Samples whose timestamp does not advance past the newest buffered one
    /// are discarded so pulled windows stay strictly increasing in time.
    /// Returns the number of samples accepted.
    pub fn push_chunk(&mut self, chunk: &Chunk) -> usize {
        let mut accepted = 0;

        for (i, &ts) in chunk.timestamps.iter().enumerate() {
            if let Some(&newest) = self.timestamps.back() {
                if ts <= newest {
                    self.out_of_order_count += 1;
                    continue;
                }
            }

            if self.timestamps.len() == self.capacity {
                self.timestamps.pop_front();
                for channel in &mut self.channels {
                    channel.pop_front();
                }
                self.overflow_count += 1;
            }

            self.timestamps.push_back(ts);
            for (channel, row) in self.channels.iter_mut().zip(&chunk.data) {
                channel.push_back(row.get(i).copied().unwrap_or(f64::NAN));
            }
            accepted += 1;
        }

        self.n_new = (self.n_new + accepted).min(self.capacity);
        self.samples_pushed += accepted as u64;
        accepted
    }

    /// Copy out the newest `n_samples` samples (or everything when `None`)
    /// for the given channel rows, in request order.
    ///
    /// Every pull marks the buffer as read.
    pub fn latest(&mut self, n_samples: Option<usize>, rows: &[usize]) -> Window {
        let available = self.timestamps.len();
        let n = n_samples.unwrap_or(available).min(available);
        let start = available - n;

        self.n_new = 0;

        Window {
            timestamps: self.timestamps.range(start..).copied().collect(),
            data: rows
                .iter()
                .map(|&row| match self.channels.get(row) {
                    Some(channel) => channel.range(start..).copied().collect(),
                    None => Vec::new(),
                })
                .collect(),
        }
    }

    /// Copy out exactly the samples pushed since the last pull
    pub fn take_unread(&mut self, rows: &[usize]) -> Window {
        let n_new = self.n_new;
        self.latest(Some(n_new), rows)
    }

    /// Samples arrived since the last pull
    pub fn n_new_samples(&self) -> usize {
        self.n_new
    }

    /// Get current buffer length
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Get buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    /// Get statistics
    pub fn stats(&self) -> BufferStats {
        BufferStats {
            len: self.len(),
            capacity: self.capacity,
            samples_pushed: self.samples_pushed,
            overflow_count: self.overflow_count,
            out_of_order_count: self.out_of_order_count,
        }
    }
}

/// Ring buffer statistics
#[derive(Debug, Clone, PartialEq)]
pub struct BufferStats {
    pub len: usize,
    pub capacity: usize,
    pub samples_pushed: u64,
    pub overflow_count: u64,
    pub out_of_order_count: u64,
}

/// Thread-safe handle to a ring buffer
pub type SharedRingBuffer = Arc<Mutex<RingBuffer>>;

/// Create a new shared ring buffer
pub fn create_shared_buffer(capacity: usize, n_channels: usize) -> SharedRingBuffer {
    Arc::new(Mutex::new(RingBuffer::new(capacity, n_channels)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Chunk of `n` samples starting at sample index `start`, at 10 Hz.
    /// Channel `c` carries the value `c * 1000 + sample_index`.
    fn chunk(start: usize, n: usize, n_channels: usize) -> Chunk {
        Chunk {
            timestamps: (start..start + n).map(|i| i as f64 * 0.1).collect(),
            data: (0..n_channels)
                .map(|c| (start..start + n).map(|i| (c * 1000 + i) as f64).collect())
                .collect(),
        }
    }

    #[test]
    fn test_ring_buffer_basic() {
        let mut buffer = RingBuffer::new(10, 2);

        assert_eq!(buffer.push_chunk(&chunk(0, 4, 2)), 4);
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.n_new_samples(), 4);

        let window = buffer.latest(Some(2), &[1, 0]);
        assert_eq!(window.timestamps, vec![2.0 * 0.1, 3.0 * 0.1]);
        assert_eq!(window.data, vec![vec![1002.0, 1003.0], vec![2.0, 3.0]]);
        assert_eq!(buffer.n_new_samples(), 0);
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut buffer = RingBuffer::new(5, 1);
        buffer.push_chunk(&chunk(0, 8, 1));

        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.stats().overflow_count, 3);
        assert_eq!(buffer.n_new_samples(), 5);

        let window = buffer.latest(None, &[0]);
        assert_eq!(window.data[0], vec![3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_window_clamped_to_available() {
        let mut buffer = RingBuffer::new(100, 1);
        buffer.push_chunk(&chunk(0, 3, 1));

        let window = buffer.latest(Some(50), &[0]);
        assert_eq!(window.n_samples(), 3);
    }

    #[test]
    fn test_stale_timestamps_rejected() {
        let mut buffer = RingBuffer::new(10, 1);
        buffer.push_chunk(&chunk(5, 2, 1));
        assert_eq!(buffer.push_chunk(&chunk(0, 6, 1)), 0);
        assert_eq!(buffer.stats().out_of_order_count, 6);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_take_unread_never_skips() {
        let mut buffer = RingBuffer::new(100, 2);
        buffer.push_chunk(&chunk(0, 3, 2));
        buffer.latest(Some(1), &[0]);

        buffer.push_chunk(&chunk(3, 4, 2));
        let first = buffer.take_unread(&[1]);
        assert_eq!(first.data[0], vec![1003.0, 1004.0, 1005.0, 1006.0]);
        assert_eq!(buffer.n_new_samples(), 0);

        buffer.push_chunk(&chunk(7, 2, 2));
        let second = buffer.take_unread(&[1]);
        assert_eq!(second.data[0], vec![1007.0, 1008.0]);

        assert!(buffer.take_unread(&[1]).is_empty());
    }

    #[test]
    fn test_huge_capacity_is_not_reserved() {
        let mut buffer = RingBuffer::new(usize::MAX, 4);
        assert_eq!(buffer.capacity(), usize::MAX);
        buffer.push_chunk(&chunk(0, 5, 4));
        assert_eq!(buffer.len(), 5);
    }

    #[test]
    fn test_empty_pull() {
        let mut buffer = RingBuffer::new(10, 3);
        let window = buffer.latest(Some(4), &[0, 2]);
        assert!(window.is_empty());
        assert_eq!(window.n_channels(), 2);
    }

    proptest! {
        #[test]
        fn prop_window_shape_and_order(
            capacity in 1usize..64,
            chunks in proptest::collection::vec(1usize..20, 1..10),
            request in proptest::option::of(0usize..80),
            rows in proptest::collection::vec(0usize..4, 1..6),
        ) {
            let mut buffer = RingBuffer::new(capacity, 4);
            let mut start = 0;
            for n in chunks {
                buffer.push_chunk(&chunk(start, n, 4));
                start += n;
            }

            let window = buffer.latest(request, &rows);

            prop_assert_eq!(window.n_channels(), rows.len());
            for row in &window.data {
                prop_assert_eq!(row.len(), window.n_samples());
            }
            prop_assert!(window.n_samples() <= capacity);
            prop_assert!(window.timestamps.windows(2).all(|w| w[0] < w[1]));
            if let Some(last) = window.last_timestamp() {
                prop_assert_eq!(last, (start - 1) as f64 * 0.1);
            }
        }
    }
}
