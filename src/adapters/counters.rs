// Adapters over OS counters: CPU load, available memory, disk throughput.

use super::MetricAdapter;
use crate::error::MonitorError;
use crate::models::Metric;
use crate::sysinfo_repo::{CounterKey, CounterProvider};
use std::sync::Arc;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub fn bytes_to_mb(bytes: f64) -> f64 {
    bytes / BYTES_PER_MB
}

/// Rejects NaN, infinities and negative readings.
fn non_negative(source_name: &'static str, v: f64) -> Result<f64, MonitorError> {
    if v.is_finite() && v >= 0.0 {
        Ok(v)
    } else {
        Err(MonitorError::unavailable(source_name, format!("invalid reading {v}")))
    }
}

pub struct CpuLoadAdapter {
    counters: Arc<dyn CounterProvider>,
}

impl CpuLoadAdapter {
    pub fn new(counters: Arc<dyn CounterProvider>) -> Self {
        Self { counters }
    }
}

impl MetricAdapter for CpuLoadAdapter {
    type Output = f64;
    const METRIC: Metric = Metric::CpuLoad;

    fn read(&self) -> Result<f64, MonitorError> {
        let v = self.counters.next_value(&CounterKey::PROCESSOR_TIME)?;
        Ok(non_negative("cpu_load", v)?.min(100.0))
    }
}

/// Reports available memory in bytes.
pub struct MemoryAdapter {
    counters: Arc<dyn CounterProvider>,
}

impl MemoryAdapter {
    pub fn new(counters: Arc<dyn CounterProvider>) -> Self {
        Self { counters }
    }
}

impl MetricAdapter for MemoryAdapter {
    type Output = u64;
    const METRIC: Metric = Metric::Memory;

    fn read(&self) -> Result<u64, MonitorError> {
        let v = self.counters.next_value(&CounterKey::AVAILABLE_MEMORY)?;
        Ok(non_negative("memory", v)? as u64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskThroughput {
    pub read_mb_per_sec: f64,
    pub write_mb_per_sec: f64,
}

/// Reads both disk rate counters and converts bytes/s to MB/s. Either
/// counter failing makes the whole reading unavailable.
pub struct DiskAdapter {
    counters: Arc<dyn CounterProvider>,
}

impl DiskAdapter {
    pub fn new(counters: Arc<dyn CounterProvider>) -> Self {
        Self { counters }
    }
}

impl MetricAdapter for DiskAdapter {
    type Output = DiskThroughput;
    const METRIC: Metric = Metric::Disk;

    fn read(&self) -> Result<DiskThroughput, MonitorError> {
        let read = self.counters.next_value(&CounterKey::DISK_READ_BYTES)?;
        let write = self.counters.next_value(&CounterKey::DISK_WRITE_BYTES)?;
        Ok(DiskThroughput {
            read_mb_per_sec: bytes_to_mb(non_negative("disk_read", read)?),
            write_mb_per_sec: bytes_to_mb(non_negative("disk_write", write)?),
        })
    }
}
