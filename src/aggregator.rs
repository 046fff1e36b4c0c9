// Snapshot aggregator: one cycle = every adapter sampled once, concurrently,
// on the blocking pool; results folded into one Snapshot.

use crate::adapters::{
    CpuLoadAdapter, CpuTemperatureAdapter, DiskAdapter, DiskThroughput, GpuAdapter, GpuReading,
    MemoryAdapter, MetricAdapter, SensorRules,
};
use crate::hwmon::HardwareHandle;
use crate::models::{Metric, Snapshot, TOTAL_MEMORY_SENTINEL, memory_used_percent};
use crate::scheduler::Collector;
use crate::sysinfo_repo::CounterProvider;
use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tracing::Instrument;

/// Per-family results of one cycle; `None` = unavailable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Readings {
    pub cpu_usage_percent: Option<f64>,
    pub available_memory_bytes: Option<u64>,
    pub disk: Option<DiskThroughput>,
    pub cpu_temperature_celsius: Option<f64>,
    pub gpu: Option<GpuReading>,
}

/// How long one adapter may take before its field is reported unavailable.
pub const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(2);

pub struct Aggregator {
    cpu_load: Arc<CpuLoadAdapter>,
    memory: Arc<MemoryAdapter>,
    disk: Arc<DiskAdapter>,
    cpu_temperature: Arc<CpuTemperatureAdapter>,
    gpu: Arc<GpuAdapter>,
    hardware: Arc<HardwareHandle>,
    total_memory_bytes: u64,
    total_memory_known: bool,
    adapter_timeout: Duration,
    sequence: u64,
}

impl Aggregator {
    /// Builds all adapters and captures total memory once. May block briefly
    /// on the counter provider.
    pub fn new(
        counters: Arc<dyn CounterProvider>,
        hardware: Arc<HardwareHandle>,
        rules: SensorRules,
    ) -> Self {
        let (total_memory_bytes, total_memory_known) = match counters.total_memory() {
            Ok(total) if total > 0 => (total, true),
            Ok(_) => {
                tracing::warn!(
                    operation = "total_memory",
                    "total memory reported as 0; memory metrics degraded"
                );
                (TOTAL_MEMORY_SENTINEL, false)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    operation = "total_memory",
                    "total memory unavailable; memory metrics degraded"
                );
                (TOTAL_MEMORY_SENTINEL, false)
            }
        };

        Self {
            cpu_load: Arc::new(CpuLoadAdapter::new(counters.clone())),
            memory: Arc::new(MemoryAdapter::new(counters.clone())),
            disk: Arc::new(DiskAdapter::new(counters)),
            cpu_temperature: Arc::new(CpuTemperatureAdapter::new(
                hardware.clone(),
                rules.cpu_temperature.clone(),
            )),
            gpu: Arc::new(GpuAdapter::new(hardware.clone(), rules)),
            hardware,
            total_memory_bytes,
            total_memory_known,
            adapter_timeout: DEFAULT_ADAPTER_TIMEOUT,
            sequence: 0,
        }
    }

    /// Per-adapter deadline. A provider still running when it passes is left
    /// to finish on the blocking pool; its result is discarded.
    pub fn with_adapter_timeout(mut self, timeout: Duration) -> Self {
        self.adapter_timeout = timeout;
        self
    }

    pub fn total_memory_bytes(&self) -> u64 {
        self.total_memory_bytes
    }

    /// Runs one cycle. Always produces a Snapshot, however many adapters fail.
    pub async fn collect(&mut self) -> Snapshot {
        self.sequence += 1;
        let span = tracing::debug_span!("cycle", sequence = self.sequence);
        self.run_cycle().instrument(span).await
    }

    async fn run_cycle(&self) -> Snapshot {
        let started = Instant::now();

        let limit = self.adapter_timeout;
        let (cpu_usage_percent, available_memory_bytes, disk, cpu_temperature_celsius, gpu) = tokio::join!(
            sample_blocking(self.cpu_load.clone(), limit),
            sample_blocking(self.memory.clone(), limit),
            sample_blocking(self.disk.clone(), limit),
            sample_blocking(self.cpu_temperature.clone(), limit),
            sample_blocking(self.gpu.clone(), limit),
        );
        let readings = Readings {
            cpu_usage_percent,
            available_memory_bytes,
            disk,
            cpu_temperature_celsius,
            gpu,
        };

        let snapshot = build_snapshot(
            self.sequence,
            now_millis(),
            self.total_memory_bytes,
            self.total_memory_known,
            readings,
        );
        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            degraded = snapshot.degraded.len(),
            "cycle complete"
        );
        snapshot
    }

    /// Closes the hardware handle. Safe to call more than once.
    pub fn close(&self) {
        self.hardware.close();
    }
}

impl Collector for Aggregator {
    async fn collect(&mut self) -> Snapshot {
        Aggregator::collect(self).await
    }

    fn close(&mut self) {
        Aggregator::close(self);
    }
}

/// Runs one adapter on the blocking pool. A panicking or stuck provider is
/// contained here and reported as unavailable.
async fn sample_blocking<A: MetricAdapter>(
    adapter: Arc<A>,
    limit: Duration,
) -> Option<A::Output> {
    let task = tokio::task::spawn_blocking(move || adapter.sample());
    match tokio::time::timeout(limit, task).await {
        Ok(Ok(v)) => v,
        Ok(Err(e)) => {
            tracing::warn!(metric = %A::METRIC, error = %e, "adapter task failed");
            None
        }
        Err(_) => {
            tracing::warn!(
                metric = %A::METRIC,
                timeout_ms = limit.as_millis() as u64,
                "adapter timed out; reported unavailable"
            );
            None
        }
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}

/// Folds one cycle's readings into a Snapshot. Unavailable optional fields
/// stay `None`, the rest fall back to zero; both are listed in `degraded`.
/// Without a known total, memory used percent is reported as 0.
pub fn build_snapshot(
    sequence: u64,
    timestamp: u64,
    total_memory_bytes: u64,
    total_memory_known: bool,
    readings: Readings,
) -> Snapshot {
    let mut degraded = Vec::new();
    let gpu = readings.gpu.unwrap_or_default();
    let gpu_complete = readings
        .gpu
        .is_some_and(|g| g.temperature_celsius.is_some() && g.usage_percent.is_some());

    for metric in Metric::ALL {
        let available = match metric {
            Metric::CpuLoad => readings.cpu_usage_percent.is_some(),
            Metric::Memory => total_memory_known && readings.available_memory_bytes.is_some(),
            Metric::Disk => readings.disk.is_some(),
            Metric::CpuTemperature => readings.cpu_temperature_celsius.is_some(),
            Metric::Gpu => gpu_complete,
        };
        if !available {
            degraded.push(metric);
        }
    }

    let total_memory_bytes = total_memory_bytes.max(TOTAL_MEMORY_SENTINEL);
    let available_memory_bytes = readings.available_memory_bytes.unwrap_or(0);
    let memory_used_percent = if total_memory_known && readings.available_memory_bytes.is_some() {
        memory_used_percent(total_memory_bytes, available_memory_bytes)
    } else {
        0.0
    };
    let disk = readings.disk.unwrap_or(DiskThroughput {
        read_mb_per_sec: 0.0,
        write_mb_per_sec: 0.0,
    });

    Snapshot {
        sequence,
        timestamp,
        cpu_usage_percent: readings.cpu_usage_percent.unwrap_or(0.0),
        available_memory_bytes,
        total_memory_bytes,
        memory_used_percent,
        disk_read_mb_per_sec: disk.read_mb_per_sec,
        disk_write_mb_per_sec: disk.write_mb_per_sec,
        cpu_temperature_celsius: readings.cpu_temperature_celsius,
        gpu_temperature_celsius: gpu.temperature_celsius,
        gpu_usage_percent: gpu.usage_percent.unwrap_or(0.0),
        degraded,
    }
}
