use crate::adapters::SensorRules;
use crate::aggregator::DEFAULT_ADAPTER_TIMEOUT;
use crate::hwmon::{GpuVendor, SensorKind, SensorRule};
use crate::scheduler::{MAX_INTERVAL_SECS, MIN_INTERVAL_SECS, SamplingConfig};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sampling: SamplingSection,
    pub sensors: SensorsConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplingSection {
    /// Initial refresh interval; can be changed at runtime.
    pub interval_secs: u64,
    /// Deadline for a single provider call within a cycle.
    pub adapter_timeout_ms: u64,
}

impl Default for SamplingSection {
    fn default() -> Self {
        Self {
            interval_secs: MIN_INTERVAL_SECS,
            adapter_timeout_ms: DEFAULT_ADAPTER_TIMEOUT.as_millis() as u64,
        }
    }
}

/// Sensor label tables. A sensor is selected when its name contains any of
/// the listed substrings; the first such sensor wins.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SensorsConfig {
    /// When false the hardware monitor is never opened and temperature/GPU
    /// fields stay unavailable.
    pub enabled: bool,
    pub cpu_temperature_labels: Vec<String>,
    pub gpu_temperature_labels: Vec<String>,
    pub gpu_load_labels: Vec<String>,
    /// Vendors to look for, in order of preference.
    pub gpu_vendors: Vec<GpuVendor>,
}

impl Default for SensorsConfig {
    fn default() -> Self {
        let rules = SensorRules::default();
        Self {
            enabled: true,
            cpu_temperature_labels: rules.cpu_temperature.labels,
            gpu_temperature_labels: rules.gpu_temperature.labels,
            gpu_load_labels: rules.gpu_load.labels,
            gpu_vendors: rules.gpu_vendors,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

impl AppConfig {
    /// Reads `CONFIG_FILE` if set (must exist), else `config.toml` if present,
    /// else built-in defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = match std::env::var("CONFIG_FILE") {
            Ok(path) => path,
            Err(_) if std::path::Path::new(DEFAULT_CONFIG_PATH).exists() => {
                DEFAULT_CONFIG_PATH.into()
            }
            Err(_) => {
                tracing::debug!("no config file; using defaults");
                let config = AppConfig::default();
                config.validate()?;
                return Ok(config);
            }
        };
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            (MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&self.sampling.interval_secs),
            "sampling.interval_secs must be between {} and {}, got {}",
            MIN_INTERVAL_SECS,
            MAX_INTERVAL_SECS,
            self.sampling.interval_secs
        );
        anyhow::ensure!(
            self.sampling.adapter_timeout_ms > 0,
            "sampling.adapter_timeout_ms must be > 0"
        );
        anyhow::ensure!(
            !self.sensors.cpu_temperature_labels.is_empty(),
            "sensors.cpu_temperature_labels must be non-empty"
        );
        anyhow::ensure!(
            !self.sensors.gpu_temperature_labels.is_empty(),
            "sensors.gpu_temperature_labels must be non-empty"
        );
        anyhow::ensure!(
            !self.sensors.gpu_load_labels.is_empty(),
            "sensors.gpu_load_labels must be non-empty"
        );
        let labels = self
            .sensors
            .cpu_temperature_labels
            .iter()
            .chain(&self.sensors.gpu_temperature_labels)
            .chain(&self.sensors.gpu_load_labels);
        for label in labels {
            anyhow::ensure!(
                !label.trim().is_empty(),
                "sensors labels must not contain empty strings"
            );
        }
        Ok(())
    }

    pub fn sampling_config(&self) -> anyhow::Result<SamplingConfig> {
        Ok(SamplingConfig::new(self.sampling.interval_secs)?)
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_millis(self.sampling.adapter_timeout_ms)
    }

    pub fn sensor_rules(&self) -> SensorRules {
        SensorRules {
            cpu_temperature: SensorRule::new(
                SensorKind::Temperature,
                self.sensors.cpu_temperature_labels.iter().cloned(),
            ),
            gpu_temperature: SensorRule::new(
                SensorKind::Temperature,
                self.sensors.gpu_temperature_labels.iter().cloned(),
            ),
            gpu_load: SensorRule::new(
                SensorKind::Load,
                self.sensors.gpu_load_labels.iter().cloned(),
            ),
            gpu_vendors: self.sensors.gpu_vendors.clone(),
        }
    }
}
