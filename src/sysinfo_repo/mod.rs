// OS counters via sysinfo: CPU load, memory, disk throughput.

mod linux;

use crate::error::MonitorError;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::sync::Mutex;
use std::time::Instant;
use sysinfo::{Disks, System};
use tracing::instrument;

const SOURCE: &str = "os_counters";

/// Identifies one OS counter by (category, counter, instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CounterKey {
    pub category: &'static str,
    pub counter: &'static str,
    pub instance: Option<&'static str>,
}

impl CounterKey {
    pub const PROCESSOR_TIME: CounterKey = CounterKey {
        category: "Processor",
        counter: "% Processor Time",
        instance: Some("_Total"),
    };
    pub const AVAILABLE_MEMORY: CounterKey = CounterKey {
        category: "Memory",
        counter: "Available Bytes",
        instance: None,
    };
    pub const DISK_READ_BYTES: CounterKey = CounterKey {
        category: "PhysicalDisk",
        counter: "Disk Read Bytes/sec",
        instance: Some("_Total"),
    };
    pub const DISK_WRITE_BYTES: CounterKey = CounterKey {
        category: "PhysicalDisk",
        counter: "Disk Write Bytes/sec",
        instance: Some("_Total"),
    };
}

/// Named rate/gauge values exposed by the operating system.
///
/// Implementations may block on I/O; callers run them off the async workers.
pub trait CounterProvider: Send + Sync {
    /// Current value of a counter. Rate counters report per-second values
    /// since the previous call for the same key.
    fn next_value(&self, key: &CounterKey) -> Result<f64, MonitorError>;

    /// Installed physical memory in bytes.
    fn total_memory(&self) -> Result<u64, MonitorError>;
}

/// Previous cumulative reading for a rate counter.
type RateBaseline = Mutex<Option<(u64, Instant)>>;

pub struct SysinfoCounters {
    sys: Mutex<System>,
    disks: Mutex<Disks>,
    last_cpu_refresh: Mutex<Option<(Instant, f64)>>,
    last_disk_read: RateBaseline,
    last_disk_write: RateBaseline,
}

impl Default for SysinfoCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoCounters {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu_all();
        let disks = Disks::new_with_refreshed_list();
        Self {
            sys: Mutex::new(sys),
            disks: Mutex::new(disks),
            last_cpu_refresh: Mutex::new(None),
            last_disk_read: Mutex::new(None),
            last_disk_write: Mutex::new(None),
        }
    }

    fn cpu_usage(&self) -> Result<f64, MonitorError> {
        let mut sys = self
            .sys
            .lock()
            .map_err(|e| MonitorError::unavailable(SOURCE, format!("sysinfo lock poisoned: {e}")))?;
        let mut guard = self
            .last_cpu_refresh
            .lock()
            .map_err(|e| MonitorError::unavailable(SOURCE, format!("cpu baseline lock poisoned: {e}")))?;

        let now = Instant::now();
        let usage = match *guard {
            Some((prev_ts, prev_usage)) => {
                if now.duration_since(prev_ts) >= sysinfo::MINIMUM_CPU_UPDATE_INTERVAL {
                    sys.refresh_cpu_all();
                    let usage = sys.global_cpu_usage() as f64;
                    *guard = Some((now, usage));
                    usage
                } else {
                    // Too soon for sysinfo to produce a new value; reuse the last one
                    prev_usage
                }
            }
            None => {
                // First call establishes the baseline
                sys.refresh_cpu_all();
                *guard = Some((now, 0.0));
                0.0
            }
        };
        Ok(usage.clamp(0.0, 100.0))
    }

    fn available_memory(&self) -> Result<f64, MonitorError> {
        let mut sys = self
            .sys
            .lock()
            .map_err(|e| MonitorError::unavailable(SOURCE, format!("sysinfo lock poisoned: {e}")))?;
        sys.refresh_memory();
        Ok(sys.available_memory() as f64)
    }

    fn disk_rate(&self, key: &CounterKey) -> Result<f64, MonitorError> {
        let (read_total, write_total) = {
            let mut disks = self.disks.lock().map_err(|e| {
                MonitorError::unavailable(SOURCE, format!("sysinfo disks lock poisoned: {e}"))
            })?;
            disks.refresh(false);
            if disks.list().is_empty() {
                return Err(MonitorError::unavailable(SOURCE, "no disks listed"));
            }
            device_totals(disks.list().iter().map(|d| {
                let usage = d.usage();
                (d.name(), usage.total_read_bytes, usage.total_written_bytes)
            }))
        };

        let (baseline, total) = if *key == CounterKey::DISK_READ_BYTES {
            (&self.last_disk_read, read_total)
        } else {
            (&self.last_disk_write, write_total)
        };
        let mut guard = baseline
            .lock()
            .map_err(|e| MonitorError::unavailable(SOURCE, format!("disk baseline lock poisoned: {e}")))?;
        let now = Instant::now();
        let rate = guard
            .map(|(prev_total, prev_ts)| rate_per_sec(prev_total, total, now.duration_since(prev_ts).as_secs_f64()))
            .unwrap_or(0.0);
        *guard = Some((total, now));
        Ok(rate)
    }
}

impl CounterProvider for SysinfoCounters {
    #[instrument(level = "trace", skip(self), fields(repo = "sysinfo", operation = "next_value"))]
    fn next_value(&self, key: &CounterKey) -> Result<f64, MonitorError> {
        match *key {
            CounterKey::PROCESSOR_TIME => self.cpu_usage(),
            CounterKey::AVAILABLE_MEMORY => self.available_memory(),
            CounterKey::DISK_READ_BYTES | CounterKey::DISK_WRITE_BYTES => self.disk_rate(key),
            _ => Err(MonitorError::unavailable(
                SOURCE,
                format!("unknown counter {}\\{}", key.category, key.counter),
            )),
        }
    }

    #[instrument(level = "trace", skip(self), fields(repo = "sysinfo", operation = "total_memory"))]
    fn total_memory(&self) -> Result<u64, MonitorError> {
        let mut sys = self
            .sys
            .lock()
            .map_err(|e| MonitorError::unavailable(SOURCE, format!("sysinfo lock poisoned: {e}")))?;
        sys.refresh_memory();
        let total = sys.total_memory();
        if total > 0 {
            return Ok(total);
        }
        linux::read_mem_total_linux()
            .ok_or_else(|| MonitorError::unavailable(SOURCE, "total memory not reported"))
    }
}

/// Sums cumulative (read, written) bytes over distinct devices. sysinfo lists
/// one entry per mount point, so a device mounted twice appears twice.
pub(crate) fn device_totals<'a>(
    rows: impl IntoIterator<Item = (&'a OsStr, u64, u64)>,
) -> (u64, u64) {
    let mut devices: BTreeMap<&OsStr, (u64, u64)> = BTreeMap::new();
    for (name, read, written) in rows {
        devices.entry(name).or_insert((read, written));
    }
    devices.values().fold((0, 0), |(r, w), &(read, written)| {
        (r.saturating_add(read), w.saturating_add(written))
    })
}

/// Bytes per second between two cumulative readings. A counter that went
/// backwards (device removed, wrap) reports 0 rather than a huge value.
pub(crate) fn rate_per_sec(prev_total: u64, total: u64, dt_secs: f64) -> f64 {
    if dt_secs <= 0.0 {
        return 0.0;
    }
    total.saturating_sub(prev_total) as f64 / dt_secs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_per_sec_divides_delta_by_elapsed() {
        assert_eq!(rate_per_sec(1_000, 3_000, 2.0), 1_000.0);
    }

    #[test]
    fn rate_per_sec_is_zero_for_non_positive_elapsed() {
        assert_eq!(rate_per_sec(0, 5_000, 0.0), 0.0);
    }

    #[test]
    fn rate_per_sec_is_zero_when_counter_goes_backwards() {
        assert_eq!(rate_per_sec(5_000, 1_000, 1.0), 0.0);
    }

    #[test]
    fn device_totals_counts_each_device_once() {
        let rows = [
            (OsStr::new("/dev/sda2"), 4_000, 1_000),
            (OsStr::new("/dev/sda2"), 4_000, 1_000),
            (OsStr::new("/dev/nvme0n1p1"), 500, 250),
            (OsStr::new("/dev/sda2"), 4_000, 1_000),
        ];
        assert_eq!(device_totals(rows), (4_500, 1_250));
    }

    #[test]
    fn device_totals_empty() {
        assert_eq!(device_totals(std::iter::empty()), (0, 0));
    }

    #[test]
    fn unknown_counter_is_unavailable() {
        let counters = SysinfoCounters::new();
        let key = CounterKey {
            category: "Network Interface",
            counter: "Bytes Total/sec",
            instance: None,
        };
        let err = counters.next_value(&key).unwrap_err();
        assert!(matches!(err, MonitorError::SourceUnavailable { .. }));
    }
}
