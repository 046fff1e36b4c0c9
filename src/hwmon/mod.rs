// Hardware-monitoring provider: a tree of devices, each exposing typed sensors.

pub mod gpu;
pub mod handle;
pub mod selection;
mod sysinfo_monitor;

pub use handle::HardwareHandle;
pub use selection::{SensorRule, select_sensor};
pub use sysinfo_monitor::SysinfoHardwareMonitor;

use crate::config::SensorsConfig;
use crate::error::MonitorError;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HardwareKind {
    Cpu,
    GpuNvidia,
    GpuAmd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Temperature,
    Load,
}

/// One named reading. `value` is `None` when the device exposes the sensor
/// but could not report it this time.
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    pub kind: SensorKind,
    pub name: String,
    pub value: Option<f32>,
}

impl Sensor {
    pub fn new(kind: SensorKind, name: impl Into<String>, value: Option<f32>) -> Self {
        Self {
            kind,
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hardware {
    pub kind: HardwareKind,
    pub name: String,
    pub sensors: Vec<Sensor>,
}

/// GPU vendors in config order of preference; lowercase in TOML ("nvidia", "amd").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuVendor {
    Nvidia,
    Amd,
}

impl GpuVendor {
    pub fn hardware_kind(self) -> HardwareKind {
        match self {
            GpuVendor::Nvidia => HardwareKind::GpuNvidia,
            GpuVendor::Amd => HardwareKind::GpuAmd,
        }
    }
}

/// A provider of hardware sensors (temperatures, loads).
///
/// `update` refreshes and returns the devices of one kind, in provider order;
/// an empty list means no such device. Calls may block.
pub trait HardwareMonitor: Send + Sync {
    fn update(&self, kind: HardwareKind) -> Result<Vec<Hardware>, MonitorError>;

    /// Release provider resources. Called at most once, by `HardwareHandle`.
    fn close(&self) {}
}

/// Handle over the system hardware monitor. With sensors disabled in config
/// the monitor is never opened and every query reports `ProviderInitialization`.
pub fn system_handle(config: &SensorsConfig) -> HardwareHandle {
    let enabled = config.enabled;
    HardwareHandle::new(move || {
        if !enabled {
            return Err(MonitorError::ProviderInitialization {
                provider: "hardware_monitor",
                reason: "disabled in config".into(),
            });
        }
        let monitor: Arc<dyn HardwareMonitor> = Arc::new(SysinfoHardwareMonitor::open()?);
        Ok(monitor)
    })
}
