//! Periodic traffic and CPU report
//!
//! The audio callback only increments [`Counters`]. Once per interval the
//! [`monitor`] task drains them, samples CPU usage and prints one line to
//! stdout:
//!
//! ```text
//!                                              total     total
//!       sent  received      sent  received      sent  received      Avg.
//!   messages  messages      kbps      kbps      kbit      kbit %CPU %CPU
//! ======================================================================
//!         43        43      1409      1409      1409      1409    6    6
//! ```

pub mod counters;
pub mod cpu;

pub use counters::{CounterSnapshot, Counters};
pub use cpu::{CpuProbe, FixedCpu, SystemCpu};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

/// Column headings and rule printed once before the first report line
pub fn header() -> String {
    format!(
        "{:>10}{:>10}{:>10}{:>10}{:>10}{:>10}\n\
         {:>10}{:>10}{:>10}{:>10}{:>10}{:>10}{:>5}{:>5}\n\
         {:>10}{:>10}{:>10}{:>10}{:>10}{:>10}{:>5}{:>5}\n\
         {}",
        "", "", "", "", "total", "total",
        "sent", "received", "sent", "received", "sent", "received", "", "Avg.",
        "messages", "messages", "kbps", "kbps", "kbit", "kbit", "%CPU", "%CPU",
        "=".repeat(70),
    )
}

/// Aggregates drained counters and CPU samples across intervals
pub struct Telemetry {
    counters: Arc<Counters>,
    cpu: Box<dyn CpuProbe>,
    cpu_total: f64,
    cpu_samples: u64,
    totals: CounterSnapshot,
}

impl Telemetry {
    pub fn new(counters: Arc<Counters>, cpu: impl CpuProbe + 'static) -> Self {
        Self {
            counters,
            cpu: Box::new(cpu),
            cpu_total: 0.0,
            cpu_samples: 0,
            totals: CounterSnapshot::default(),
        }
    }

    /// Close one interval of length `elapsed`: drain the counters, fold them
    /// into the run totals and sample the CPU.
    pub fn sample(&mut self, elapsed: Duration) -> Report {
        let interval = self.counters.take();
        self.totals = self.totals.saturating_add(interval);

        let cpu = self.cpu.sample();
        self.cpu_total += f64::from(cpu);
        self.cpu_samples += 1;

        Report {
            interval,
            elapsed,
            totals: self.totals,
            cpu,
            cpu_average: self.average_cpu(),
        }
    }

    pub fn average_cpu(&self) -> f32 {
        if self.cpu_samples == 0 {
            0.0
        } else {
            (self.cpu_total / self.cpu_samples as f64) as f32
        }
    }

    /// Run totals, including whatever the counters hold right now
    pub fn totals(&self) -> CounterSnapshot {
        self.totals.saturating_add(self.counters.peek())
    }

    pub fn summary(&self) -> Summary {
        Summary {
            totals: self.totals(),
            cpu_average: self.average_cpu(),
        }
    }
}

/// One interval's figures
#[derive(Debug, Clone, Copy)]
pub struct Report {
    pub interval: CounterSnapshot,
    pub elapsed: Duration,
    pub totals: CounterSnapshot,
    pub cpu: f32,
    pub cpu_average: f32,
}

impl Report {
    pub fn sent_kbps(&self) -> u64 {
        kbps(self.interval.bytes_sent, self.elapsed)
    }

    pub fn received_kbps(&self) -> u64 {
        kbps(self.interval.bytes_received, self.elapsed)
    }
}

fn kbps(bytes: u64, elapsed: Duration) -> u64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0;
    }
    (bytes as f64 * 8.0 / 1000.0 / secs) as u64
}

fn kbit(bytes: u64) -> u64 {
    bytes.saturating_mul(8) / 1000
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:10}{:10}{:10}{:10}{:10}{:10}{:5}{:5}",
            self.interval.messages_sent,
            self.interval.messages_received,
            self.sent_kbps(),
            self.received_kbps(),
            kbit(self.totals.bytes_sent),
            kbit(self.totals.bytes_received),
            self.cpu as u32,
            self.cpu_average as u32,
        )
    }
}

/// End-of-run statistics
#[derive(Debug, Clone, Copy)]
pub struct Summary {
    pub totals: CounterSnapshot,
    pub cpu_average: f32,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "average CPU usage = {:.1} %", self.cpu_average)?;
        writeln!(
            f,
            "sent {} messages ({} bytes), received {} messages ({} bytes)",
            self.totals.messages_sent,
            self.totals.bytes_sent,
            self.totals.messages_received,
            self.totals.bytes_received,
        )?;
        write!(
            f,
            "send failures {}, receive failures {}, malformed packets {}",
            self.totals.send_failures, self.totals.receive_failures, self.totals.malformed_packets,
        )
    }
}

/// Print one report line every `period` until `shutdown` flips.
///
/// Returns the aggregator so the caller can print the final summary.
pub async fn monitor(
    mut telemetry: Telemetry,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Telemetry {
    println!("{}", header());

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    ticker.tick().await;
    let mut last = Instant::now();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                let report = telemetry.sample(now - last);
                last = now;
                println!("{}", report);
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    tracing::debug!("Telemetry stopped");
    telemetry
}
