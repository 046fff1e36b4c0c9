// Linux hardware monitor: CPU temperatures from sysinfo components, GPUs
// from nvidia-smi and amdgpu sysfs.

use super::gpu;
use super::{Hardware, HardwareKind, HardwareMonitor, Sensor, SensorKind};
use crate::error::MonitorError;
use std::path::PathBuf;
use std::sync::Mutex;
use sysinfo::Components;
use tracing::instrument;

const PROVIDER: &str = "hardware_monitor";

/// Component label prefixes of CPU temperature drivers.
const CPU_DRIVERS: &[&str] = &["coretemp", "k10temp", "zenpower", "cpu_thermal", "cpu"];

pub struct SysinfoHardwareMonitor {
    components: Mutex<Components>,
    nvidia: bool,
    amd_cards: Vec<PathBuf>,
}

impl SysinfoHardwareMonitor {
    /// Enumerate sensor sources. Fails when the machine exposes none at all.
    pub fn open() -> Result<Self, MonitorError> {
        let components = Components::new_with_refreshed_list();
        let nvidia = match gpu::query_nvidia() {
            Ok(gpus) => !gpus.is_empty(),
            Err(e) => {
                tracing::debug!(error = %e, "nvidia-smi not usable");
                false
            }
        };
        let amd_cards = gpu::amd_card_dirs();
        let cpu_sensors = components
            .list()
            .iter()
            .filter(|c| is_cpu_component(c.label()))
            .count();

        if components.list().is_empty() && !nvidia && amd_cards.is_empty() {
            return Err(MonitorError::ProviderInitialization {
                provider: PROVIDER,
                reason: "no temperature sensors or GPUs exposed".into(),
            });
        }
        tracing::debug!(
            components = components.list().len(),
            cpu_sensors,
            nvidia,
            amd_gpus = amd_cards.len(),
            "hardware sensors enumerated"
        );
        Ok(Self {
            components: Mutex::new(components),
            nvidia,
            amd_cards,
        })
    }

    fn cpu(&self) -> Result<Vec<Hardware>, MonitorError> {
        let mut components = self.components.lock().map_err(|e| {
            MonitorError::unavailable(PROVIDER, format!("components lock poisoned: {e}"))
        })?;
        components.refresh(false);
        let sensors: Vec<Sensor> = components
            .list()
            .iter()
            .filter(|c| is_cpu_component(c.label()))
            .map(|c| Sensor::new(SensorKind::Temperature, c.label(), c.temperature()))
            .collect();
        if sensors.is_empty() {
            return Ok(vec![]);
        }
        Ok(vec![Hardware {
            kind: HardwareKind::Cpu,
            name: "cpu".into(),
            sensors,
        }])
    }
}

impl HardwareMonitor for SysinfoHardwareMonitor {
    #[instrument(level = "trace", skip(self), fields(provider = PROVIDER, operation = "update"))]
    fn update(&self, kind: HardwareKind) -> Result<Vec<Hardware>, MonitorError> {
        match kind {
            HardwareKind::Cpu => self.cpu(),
            HardwareKind::GpuNvidia if self.nvidia => gpu::query_nvidia()
                .map_err(|e| MonitorError::unavailable(PROVIDER, format!("nvidia-smi: {e}"))),
            HardwareKind::GpuNvidia => Ok(vec![]),
            HardwareKind::GpuAmd => Ok(self.amd_cards.iter().map(|c| gpu::read_amd_card(c)).collect()),
        }
    }
}

fn is_cpu_component(label: &str) -> bool {
    let label = label.to_ascii_lowercase();
    CPU_DRIVERS.iter().any(|d| label.starts_with(d))
}
