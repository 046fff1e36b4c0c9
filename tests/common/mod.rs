// Shared test helpers: fake counter and hardware providers.
#![allow(dead_code)]

use pcmonitor::error::MonitorError;
use pcmonitor::hwmon::{Hardware, HardwareHandle, HardwareKind, HardwareMonitor, Sensor, SensorKind};
use pcmonitor::models::Snapshot;
use pcmonitor::sysinfo_repo::{CounterKey, CounterProvider};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

pub const MB: u64 = 1024 * 1024;

/// Counter provider backed by a map; missing keys are unavailable.
pub struct FakeCounters {
    values: Mutex<HashMap<CounterKey, f64>>,
    total_memory: Option<u64>,
    panic_on: Option<CounterKey>,
}

impl FakeCounters {
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            total_memory: None,
            panic_on: None,
        }
    }

    pub fn with(self, key: CounterKey, value: f64) -> Self {
        self.set(key, value);
        self
    }

    pub fn with_total_memory(mut self, total: Option<u64>) -> Self {
        self.total_memory = total;
        self
    }

    pub fn panicking_on(mut self, key: CounterKey) -> Self {
        self.panic_on = Some(key);
        self
    }

    pub fn without(self, key: CounterKey) -> Self {
        self.values.lock().unwrap().remove(&key);
        self
    }

    pub fn set(&self, key: CounterKey, value: f64) {
        self.values.lock().unwrap().insert(key, value);
    }
}

impl CounterProvider for FakeCounters {
    fn next_value(&self, key: &CounterKey) -> Result<f64, MonitorError> {
        if self.panic_on.as_ref() == Some(key) {
            panic!("counter provider crashed");
        }
        self.values
            .lock()
            .unwrap()
            .get(key)
            .copied()
            .ok_or_else(|| MonitorError::unavailable("fake_counters", "no such counter"))
    }

    fn total_memory(&self) -> Result<u64, MonitorError> {
        self.total_memory
            .ok_or_else(|| MonitorError::unavailable("fake_counters", "total memory unknown"))
    }
}

/// Counters from the reference scenario: 42.5% CPU, 2048 of 8192 MB
/// available, 1 MiB/s read, 0 write.
pub fn scenario_counters() -> FakeCounters {
    FakeCounters::new()
        .with(CounterKey::PROCESSOR_TIME, 42.5)
        .with(CounterKey::AVAILABLE_MEMORY, (2048 * MB) as f64)
        .with(CounterKey::DISK_READ_BYTES, 1_048_576.0)
        .with(CounterKey::DISK_WRITE_BYTES, 0.0)
        .with_total_memory(Some(8192 * MB))
}

/// Hardware monitor serving a fixed device list and recording calls.
#[derive(Default)]
pub struct FakeHardwareMonitor {
    devices: Mutex<Vec<Hardware>>,
    pub updates: AtomicUsize,
    pub closes: AtomicUsize,
    pub updated_after_close: AtomicBool,
}

impl FakeHardwareMonitor {
    pub fn new(devices: Vec<Hardware>) -> Self {
        Self {
            devices: Mutex::new(devices),
            ..Default::default()
        }
    }

    pub fn set_devices(&self, devices: Vec<Hardware>) {
        *self.devices.lock().unwrap() = devices;
    }
}

impl HardwareMonitor for FakeHardwareMonitor {
    fn update(&self, kind: HardwareKind) -> Result<Vec<Hardware>, MonitorError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.closes.load(Ordering::SeqCst) > 0 {
            self.updated_after_close.store(true, Ordering::SeqCst);
        }
        Ok(self
            .devices
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.kind == kind)
            .cloned()
            .collect())
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hardware monitor whose `update` hangs until `release` is called (or a
/// safety cap passes), like a driver tool that stopped responding.
#[derive(Default)]
pub struct StuckHardwareMonitor {
    released: Mutex<bool>,
    wake: Condvar,
    pub calls: AtomicUsize,
}

impl StuckHardwareMonitor {
    pub fn release(&self) {
        *self.released.lock().unwrap() = true;
        self.wake.notify_all();
    }
}

impl HardwareMonitor for StuckHardwareMonitor {
    fn update(&self, _kind: HardwareKind) -> Result<Vec<Hardware>, MonitorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let guard = self.released.lock().unwrap();
        let _ = self
            .wake
            .wait_timeout_while(guard, Duration::from_secs(30), |released| !*released)
            .unwrap();
        Ok(scenario_devices())
    }
}

pub fn cpu_device(sensors: Vec<Sensor>) -> Hardware {
    Hardware {
        kind: HardwareKind::Cpu,
        name: "Test CPU".into(),
        sensors,
    }
}

pub fn nvidia_device(temperature: Option<f32>, load: Option<f32>) -> Hardware {
    Hardware {
        kind: HardwareKind::GpuNvidia,
        name: "Test GPU".into(),
        sensors: vec![
            Sensor::new(SensorKind::Temperature, "GPU Core", temperature),
            Sensor::new(SensorKind::Load, "GPU Core", load),
        ],
    }
}

/// Devices from the reference scenario: a CPU without temperature sensors
/// and an NVIDIA GPU at 65 °C / 30 %.
pub fn scenario_devices() -> Vec<Hardware> {
    vec![
        cpu_device(vec![Sensor::new(SensorKind::Load, "CPU Total", Some(42.5))]),
        nvidia_device(Some(65.0), Some(30.0)),
    ]
}

/// Handle over `monitor`, plus a counter of how many times it was opened.
pub fn handle_for<M: HardwareMonitor + 'static>(
    monitor: Arc<M>,
) -> (Arc<HardwareHandle>, Arc<AtomicUsize>) {
    let opens = Arc::new(AtomicUsize::new(0));
    let opens_in = opens.clone();
    let handle = HardwareHandle::new(move || {
        opens_in.fetch_add(1, Ordering::SeqCst);
        let monitor: Arc<dyn HardwareMonitor> = monitor;
        Ok(monitor)
    });
    (Arc::new(handle), opens)
}

/// Handle whose open always fails, plus an open-attempt counter.
pub fn failing_handle() -> (Arc<HardwareHandle>, Arc<AtomicUsize>) {
    let opens = Arc::new(AtomicUsize::new(0));
    let opens_in = opens.clone();
    let handle = HardwareHandle::new(move || {
        opens_in.fetch_add(1, Ordering::SeqCst);
        Err(MonitorError::ProviderInitialization {
            provider: "hardware_monitor",
            reason: "driver not loaded".into(),
        })
    });
    (Arc::new(handle), opens)
}

pub fn minimal_snapshot(sequence: u64) -> Snapshot {
    Snapshot {
        sequence,
        timestamp: 0,
        cpu_usage_percent: 0.0,
        available_memory_bytes: 0,
        total_memory_bytes: 1,
        memory_used_percent: 0.0,
        disk_read_mb_per_sec: 0.0,
        disk_write_mb_per_sec: 0.0,
        cpu_temperature_celsius: None,
        gpu_temperature_celsius: None,
        gpu_usage_percent: 0.0,
        degraded: vec![],
    }
}
