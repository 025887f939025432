//! Counters shared between the audio callback and the reporter
//!
//! The callback only ever does relaxed `fetch_add`; the reporter drains
//! with `swap(0)`. Neither side can make the other wait.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-interval tallies plus a few diagnostics
#[derive(Debug, Default)]
pub struct Counters {
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    send_failures: AtomicU64,
    malformed_packets: AtomicU64,
    receive_failures: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sent(&self, bytes: usize) {
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_received(&self, bytes: usize) {
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed_packets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_receive_failure(&self) {
        self.receive_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Read and reset everything in one pass
    pub fn take(&self) -> CounterSnapshot {
        CounterSnapshot {
            bytes_sent: self.bytes_sent.swap(0, Ordering::Relaxed),
            bytes_received: self.bytes_received.swap(0, Ordering::Relaxed),
            messages_sent: self.messages_sent.swap(0, Ordering::Relaxed),
            messages_received: self.messages_received.swap(0, Ordering::Relaxed),
            send_failures: self.send_failures.swap(0, Ordering::Relaxed),
            malformed_packets: self.malformed_packets.swap(0, Ordering::Relaxed),
            receive_failures: self.receive_failures.swap(0, Ordering::Relaxed),
        }
    }

    /// Read without resetting
    pub fn peek(&self) -> CounterSnapshot {
        CounterSnapshot {
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            malformed_packets: self.malformed_packets.load(Ordering::Relaxed),
            receive_failures: self.receive_failures.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of the counters at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub send_failures: u64,
    pub malformed_packets: u64,
    pub receive_failures: u64,
}

impl CounterSnapshot {
    /// Field-wise saturating sum. Saturation rather than wraparound is the
    /// only overflow handling for the run totals.
    pub fn saturating_add(self, other: CounterSnapshot) -> CounterSnapshot {
        CounterSnapshot {
            bytes_sent: self.bytes_sent.saturating_add(other.bytes_sent),
            bytes_received: self.bytes_received.saturating_add(other.bytes_received),
            messages_sent: self.messages_sent.saturating_add(other.messages_sent),
            messages_received: self.messages_received.saturating_add(other.messages_received),
            send_failures: self.send_failures.saturating_add(other.send_failures),
            malformed_packets: self.malformed_packets.saturating_add(other.malformed_packets),
            receive_failures: self.receive_failures.saturating_add(other.receive_failures),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_take_resets() {
        let counters = Counters::new();
        counters.record_sent(4096);
        counters.record_sent(4096);
        counters.record_received(4096);
        counters.record_malformed();

        let snapshot = counters.take();
        assert_eq!(snapshot.messages_sent, 2);
        assert_eq!(snapshot.bytes_sent, 8192);
        assert_eq!(snapshot.messages_received, 1);
        assert_eq!(snapshot.malformed_packets, 1);

        assert_eq!(counters.take(), CounterSnapshot::default());
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let counters = Arc::new(Counters::new());
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let counters = counters.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        counters.record_sent(2);
                    }
                })
            })
            .collect();

        let mut drained = CounterSnapshot::default();
        for _ in 0..10 {
            drained = drained.saturating_add(counters.take());
        }
        for worker in workers {
            worker.join().unwrap();
        }
        drained = drained.saturating_add(counters.take());

        assert_eq!(drained.messages_sent, 4000);
        assert_eq!(drained.bytes_sent, 8000);
    }

    #[test]
    fn test_totals_saturate() {
        let near_max = CounterSnapshot {
            bytes_sent: u64::MAX - 1,
            ..Default::default()
        };
        let more = CounterSnapshot {
            bytes_sent: 10,
            ..Default::default()
        };
        assert_eq!(near_max.saturating_add(more).bytes_sent, u64::MAX);
    }
}
