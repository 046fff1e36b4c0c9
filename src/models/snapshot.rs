// Snapshot produced once per sampling cycle

use serde::{Deserialize, Serialize};
use std::fmt;

/// Substituted when total memory cannot be determined, so the used-percent
/// division never sees zero.
pub const TOTAL_MEMORY_SENTINEL: u64 = 1;

/// Metric families, one per adapter. Serializes to camelCase (e.g. "cpuLoad").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    CpuLoad,
    Memory,
    Disk,
    CpuTemperature,
    Gpu,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::CpuLoad,
        Metric::Memory,
        Metric::Disk,
        Metric::CpuTemperature,
        Metric::Gpu,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::CpuLoad => "cpu_load",
            Metric::Memory => "memory",
            Metric::Disk => "disk",
            Metric::CpuTemperature => "cpu_temperature",
            Metric::Gpu => "gpu",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All metric values as of one cycle. Unavailable optional fields are `None`;
/// unavailable fields with a natural zero are `0` and listed in `degraded`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Cycle number, starting at 1.
    pub sequence: u64,
    /// Unix millis at cycle completion.
    pub timestamp: u64,
    pub cpu_usage_percent: f64,
    pub available_memory_bytes: u64,
    pub total_memory_bytes: u64,
    /// Unclamped; values outside [0, 100] indicate a measurement anomaly.
    pub memory_used_percent: f64,
    pub disk_read_mb_per_sec: f64,
    pub disk_write_mb_per_sec: f64,
    pub cpu_temperature_celsius: Option<f64>,
    pub gpu_temperature_celsius: Option<f64>,
    pub gpu_usage_percent: f64,
    #[serde(default)]
    pub degraded: Vec<Metric>,
}

impl Snapshot {
    pub fn is_degraded(&self, metric: Metric) -> bool {
        self.degraded.contains(&metric)
    }

    pub fn cpu_usage_display(&self) -> f64 {
        clamp_percent(self.cpu_usage_percent)
    }

    pub fn memory_used_percent_display(&self) -> f64 {
        clamp_percent(self.memory_used_percent)
    }

    pub fn gpu_usage_display(&self) -> f64 {
        clamp_percent(self.gpu_usage_percent)
    }

    /// True when the raw memory percentage fell outside [0, 100]
    /// (e.g. available reported above total).
    pub fn memory_anomaly(&self) -> bool {
        !(0.0..=100.0).contains(&self.memory_used_percent)
    }
}

/// `(total - available) / total * 100`, computed in floating point so
/// available > total yields a negative (anomalous) value instead of wrapping.
pub fn memory_used_percent(total_bytes: u64, available_bytes: u64) -> f64 {
    if total_bytes == 0 {
        return 0.0;
    }
    (total_bytes as f64 - available_bytes as f64) / total_bytes as f64 * 100.0
}

fn clamp_percent(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 100.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_used_percent_basic() {
        let total = 8192 * 1024 * 1024;
        let available = 2048 * 1024 * 1024;
        assert_eq!(memory_used_percent(total, available), 75.0);
    }

    #[test]
    fn memory_used_percent_zero_total_does_not_divide() {
        assert_eq!(memory_used_percent(0, 100), 0.0);
    }

    #[test]
    fn memory_used_percent_negative_when_available_exceeds_total() {
        assert!(memory_used_percent(100, 150) < 0.0);
    }

    #[test]
    fn display_accessors_clamp() {
        let s = Snapshot {
            sequence: 1,
            timestamp: 0,
            cpu_usage_percent: 120.0,
            available_memory_bytes: 150,
            total_memory_bytes: 100,
            memory_used_percent: -50.0,
            disk_read_mb_per_sec: 0.0,
            disk_write_mb_per_sec: 0.0,
            cpu_temperature_celsius: None,
            gpu_temperature_celsius: None,
            gpu_usage_percent: f64::NAN,
            degraded: vec![],
        };
        assert_eq!(s.cpu_usage_display(), 100.0);
        assert_eq!(s.memory_used_percent_display(), 0.0);
        assert_eq!(s.gpu_usage_display(), 0.0);
        assert!(s.memory_anomaly());
    }
}
