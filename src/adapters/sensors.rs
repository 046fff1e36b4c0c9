// Adapters over the hardware monitor: CPU temperature, GPU temperature and load.

use super::MetricAdapter;
use crate::error::MonitorError;
use crate::hwmon::{
    GpuVendor, Hardware, HardwareHandle, HardwareKind, SensorKind, SensorRule, select_sensor,
};
use crate::models::Metric;
use std::sync::Arc;

/// Label tables for sensor selection, plus GPU vendor preference.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorRules {
    pub cpu_temperature: SensorRule,
    pub gpu_temperature: SensorRule,
    pub gpu_load: SensorRule,
    pub gpu_vendors: Vec<GpuVendor>,
}

impl Default for SensorRules {
    fn default() -> Self {
        Self {
            cpu_temperature: SensorRule::new(
                SensorKind::Temperature,
                ["Package", "Core #1", "Tctl", "Tdie", "cpu_thermal"],
            ),
            gpu_temperature: SensorRule::new(SensorKind::Temperature, ["GPU Core", "edge"]),
            gpu_load: SensorRule::new(SensorKind::Load, ["GPU Core"]),
            gpu_vendors: vec![GpuVendor::Nvidia, GpuVendor::Amd],
        }
    }
}

/// A temperature of 0 or below means the sensor did not report.
fn valid_temperature(v: f32) -> Option<f64> {
    (v.is_finite() && v > 0.0).then_some(v as f64)
}

fn valid_load(v: f32) -> Option<f64> {
    (v.is_finite() && v >= 0.0).then(|| (v as f64).min(100.0))
}

fn first_device(
    hardware: &HardwareHandle,
    kind: HardwareKind,
) -> Result<Option<Hardware>, MonitorError> {
    let monitor = hardware.get()?;
    Ok(monitor.update(kind)?.into_iter().next())
}

pub struct CpuTemperatureAdapter {
    hardware: Arc<HardwareHandle>,
    rule: SensorRule,
}

impl CpuTemperatureAdapter {
    pub fn new(hardware: Arc<HardwareHandle>, rule: SensorRule) -> Self {
        Self { hardware, rule }
    }
}

impl MetricAdapter for CpuTemperatureAdapter {
    type Output = f64;
    const METRIC: Metric = Metric::CpuTemperature;

    fn read(&self) -> Result<f64, MonitorError> {
        let cpu = first_device(&self.hardware, HardwareKind::Cpu)?
            .ok_or_else(|| MonitorError::unavailable("cpu_temperature", "no CPU sensors"))?;
        select_sensor(&cpu.sensors, &self.rule)
            .and_then(|s| s.value)
            .and_then(valid_temperature)
            .ok_or_else(|| MonitorError::unavailable("cpu_temperature", "no matching sensor"))
    }
}

/// Temperature and load of one GPU; either may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GpuReading {
    pub temperature_celsius: Option<f64>,
    pub usage_percent: Option<f64>,
}

/// Reads the first device of the first vendor (in preference order) that has one.
pub struct GpuAdapter {
    hardware: Arc<HardwareHandle>,
    rules: SensorRules,
}

impl GpuAdapter {
    pub fn new(hardware: Arc<HardwareHandle>, rules: SensorRules) -> Self {
        Self { hardware, rules }
    }
}

impl MetricAdapter for GpuAdapter {
    type Output = GpuReading;
    const METRIC: Metric = Metric::Gpu;

    fn read(&self) -> Result<GpuReading, MonitorError> {
        for vendor in &self.rules.gpu_vendors {
            let gpu = match first_device(&self.hardware, vendor.hardware_kind()) {
                Ok(Some(gpu)) => gpu,
                Ok(None) => continue,
                Err(e @ MonitorError::ProviderInitialization { .. }) => return Err(e),
                Err(e) => {
                    tracing::debug!(vendor = ?vendor, error = %e, "GPU query failed");
                    continue;
                }
            };
            return Ok(GpuReading {
                temperature_celsius: select_sensor(&gpu.sensors, &self.rules.gpu_temperature)
                    .and_then(|s| s.value)
                    .and_then(valid_temperature),
                usage_percent: select_sensor(&gpu.sensors, &self.rules.gpu_load)
                    .and_then(|s| s.value)
                    .and_then(valid_load),
            });
        }
        Err(MonitorError::unavailable("gpu", "no GPU found"))
    }
}
