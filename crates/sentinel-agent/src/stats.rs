//! CPU/RAM sampling

use sysinfo::System;

/// Samples instantaneous CPU and RAM usage for heartbeats
pub struct SystemSampler {
    system: System,
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemSampler {
    /// Create a sampler and prime the CPU counters.
    ///
    /// CPU usage is a delta between refreshes, so the first real sample
    /// needs a baseline refresh behind it.
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self { system }
    }

    /// Return `(cpu_pct, ram_pct)` at this instant
    pub fn sample(&mut self) -> (f32, f32) {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let cpu = self.system.global_cpu_usage();
        let total = self.system.total_memory();
        let ram = if total == 0 {
            0.0
        } else {
            (self.system.used_memory() as f32 / total as f32) * 100.0
        };
        (cpu, ram)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_yields_percentages() {
        let mut sampler = SystemSampler::new();
        let (cpu, ram) = sampler.sample();

        assert!((0.0..=100.0).contains(&ram));
        assert!(cpu >= 0.0);
    }
}
