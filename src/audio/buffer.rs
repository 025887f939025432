//! Lock-free sample queue between the capture and playback callbacks
//!
//! cpal runs input and output as two streams. The input callback pushes
//! captured samples here; the playback side pulls exactly one chunk per
//! bridge invocation. Capacity is fixed at construction and neither side
//! ever waits on the other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::queue::ArrayQueue;

use crate::codec::WireSample;

/// Overflow/underrun tallies, shareable after the queue moves into a
/// callback
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Captured samples dropped because the queue was full
    overflow_count: AtomicU64,
    /// Chunks padded with silence because capture fell behind
    underrun_count: AtomicU64,
}

impl QueueStats {
    pub fn overflow_count(&self) -> u64 {
        self.overflow_count.load(Ordering::Relaxed)
    }

    pub fn underrun_count(&self) -> u64 {
        self.underrun_count.load(Ordering::Relaxed)
    }
}

pub struct SampleQueue<T> {
    queue: ArrayQueue<T>,
    stats: Arc<QueueStats>,
}

impl<T: WireSample> SampleQueue<T> {
    /// Create a queue holding up to `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            stats: Arc::new(QueueStats::default()),
        }
    }

    /// Push as many samples as fit. Returns how many were accepted.
    pub fn push_slice(&self, samples: &[T]) -> usize {
        for (pushed, &sample) in samples.iter().enumerate() {
            if self.queue.push(sample).is_err() {
                let dropped = (samples.len() - pushed) as u64;
                self.stats.overflow_count.fetch_add(dropped, Ordering::Relaxed);
                return pushed;
            }
        }
        samples.len()
    }

    /// Fill `out` from the queue, padding the tail with silence if fewer
    /// samples are waiting. Returns how many real samples were copied.
    pub fn pop_into(&self, out: &mut [T]) -> usize {
        let mut filled = 0;
        while filled < out.len() {
            match self.queue.pop() {
                Some(sample) => {
                    out[filled] = sample;
                    filled += 1;
                }
                None => break,
            }
        }
        if filled < out.len() {
            out[filled..].fill(T::SILENCE);
            self.stats.underrun_count.fetch_add(1, Ordering::Relaxed);
        }
        filled
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn overflow_count(&self) -> u64 {
        self.stats.overflow_count()
    }

    pub fn underrun_count(&self) -> u64 {
        self.stats.underrun_count()
    }

    pub fn stats(&self) -> Arc<QueueStats> {
        self.stats.clone()
    }
}

/// Thread-safe handle to a sample queue
pub type SharedSampleQueue<T> = Arc<SampleQueue<T>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let queue = SampleQueue::<i16>::new(8);
        assert_eq!(queue.push_slice(&[1, 2, 3]), 3);
        assert_eq!(queue.push_slice(&[4, 5]), 2);

        let mut out = [0i16; 4];
        assert_eq!(queue.pop_into(&mut out), 4);
        assert_eq!(out, [1, 2, 3, 4]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.underrun_count(), 0);
    }

    #[test]
    fn test_overflow_drops_newest() {
        let queue = SampleQueue::<i16>::new(4);
        assert_eq!(queue.push_slice(&[1, 2, 3, 4, 5, 6]), 4);
        assert_eq!(queue.overflow_count(), 2);

        let mut out = [0i16; 4];
        queue.pop_into(&mut out);
        assert_eq!(out, [1, 2, 3, 4]);
    }

    #[test]
    fn test_underrun_pads_with_silence() {
        let queue = SampleQueue::<i16>::new(8);
        queue.push_slice(&[7, 8]);

        let mut out = [9i16; 4];
        assert_eq!(queue.pop_into(&mut out), 2);
        assert_eq!(out, [7, 8, 0, 0]);
        assert_eq!(queue.underrun_count(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_cross_thread_handoff() {
        let queue: SharedSampleQueue<i32> = Arc::new(SampleQueue::new(4096));
        let producer = {
            let queue = queue.clone();
            std::thread::spawn(move || {
                let block: Vec<i32> = (0..256).collect();
                for _ in 0..8 {
                    queue.push_slice(&block);
                }
            })
        };
        producer.join().unwrap();

        let mut out = vec![0i32; 2048];
        assert_eq!(queue.pop_into(&mut out), 2048);
        assert_eq!(&out[..256], &(0..256).collect::<Vec<_>>()[..]);
        assert_eq!(queue.overflow_count(), 0);
    }
}
