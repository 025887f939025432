//! CPU utilisation sampling

use sysinfo::System;

/// Source of instantaneous whole-system CPU usage, in percent
pub trait CpuProbe: Send {
    fn sample(&mut self) -> f32;
}

/// Reads the host's global CPU usage through sysinfo.
///
/// Usage is computed between two refreshes, so the first sample after
/// construction reads as zero.
pub struct SystemCpu {
    system: System,
}

impl SystemCpu {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();
        Self { system }
    }
}

impl Default for SystemCpu {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuProbe for SystemCpu {
    fn sample(&mut self) -> f32 {
        self.system.refresh_cpu_all();
        self.system.global_cpu_usage()
    }
}

/// Always reports the same value
#[derive(Debug, Clone, Copy)]
pub struct FixedCpu(pub f32);

impl CpuProbe for FixedCpu {
    fn sample(&mut self) -> f32 {
        self.0
    }
}
