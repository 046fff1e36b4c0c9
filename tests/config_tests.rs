// Config loading and validation tests

use pcmonitor::config::{AppConfig, OutputFormat};
use pcmonitor::hwmon::{GpuVendor, SensorKind};
use std::time::Duration;

const VALID_CONFIG: &str = r#"
[sampling]
interval_secs = 5
adapter_timeout_ms = 500

[sensors]
enabled = true
cpu_temperature_labels = ["Package", "Tctl"]
gpu_temperature_labels = ["GPU Core"]
gpu_load_labels = ["GPU Core"]
gpu_vendors = ["amd", "nvidia"]

[output]
format = "json"
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.sampling.interval_secs, 5);
    assert!(config.sensors.enabled);
    assert_eq!(config.sensors.cpu_temperature_labels, vec!["Package", "Tctl"]);
    assert_eq!(
        config.sensors.gpu_vendors,
        vec![GpuVendor::Amd, GpuVendor::Nvidia]
    );
    assert_eq!(config.output.format, OutputFormat::Json);
    assert_eq!(
        config.sampling_config().unwrap().interval(),
        Duration::from_secs(5)
    );
    assert_eq!(config.adapter_timeout(), Duration::from_millis(500));
}

#[test]
fn test_empty_config_uses_defaults() {
    let config = AppConfig::load_from_str("").expect("defaults");
    assert_eq!(config.sampling.interval_secs, 1);
    assert_eq!(config.adapter_timeout(), Duration::from_secs(2));
    assert!(config.sensors.enabled);
    assert!(
        config
            .sensors
            .cpu_temperature_labels
            .contains(&"Package".to_string())
    );
    assert_eq!(config.sensors.gpu_load_labels, vec!["GPU Core"]);
    assert_eq!(
        config.sensors.gpu_vendors,
        vec![GpuVendor::Nvidia, GpuVendor::Amd]
    );
    assert_eq!(config.output.format, OutputFormat::Text);
}

#[test]
fn test_partial_section_keeps_other_defaults() {
    let config = AppConfig::load_from_str("[sensors]\nenabled = false\n").unwrap();
    assert!(!config.sensors.enabled);
    assert_eq!(config.sensors.gpu_temperature_labels, vec!["GPU Core", "edge"]);
}

#[test]
fn test_config_validation_rejects_interval_zero() {
    let bad = VALID_CONFIG.replace("interval_secs = 5", "interval_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("sampling.interval_secs"));
}

#[test]
fn test_config_validation_rejects_interval_above_sixty() {
    let bad = VALID_CONFIG.replace("interval_secs = 5", "interval_secs = 61");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("sampling.interval_secs"));
}

#[test]
fn test_config_validation_rejects_empty_label_list() {
    let bad = VALID_CONFIG.replace(
        "gpu_load_labels = [\"GPU Core\"]",
        "gpu_load_labels = []",
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("gpu_load_labels"));
}

#[test]
fn test_config_validation_rejects_blank_label() {
    let bad = VALID_CONFIG.replace("[\"Package\", \"Tctl\"]", "[\"Package\", \" \"]");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("empty strings"));
}

#[test]
fn test_config_rejects_unknown_vendor_and_format() {
    let bad = VALID_CONFIG.replace("[\"amd\", \"nvidia\"]", "[\"intel\"]");
    assert!(AppConfig::load_from_str(&bad).is_err());
    let bad = VALID_CONFIG.replace("format = \"json\"", "format = \"xml\"");
    assert!(AppConfig::load_from_str(&bad).is_err());
}

#[test]
fn test_sensor_rules_follow_config() {
    let config = AppConfig::load_from_str(VALID_CONFIG).unwrap();
    let rules = config.sensor_rules();
    assert_eq!(rules.cpu_temperature.kind, SensorKind::Temperature);
    assert_eq!(rules.cpu_temperature.labels, vec!["Package", "Tctl"]);
    assert_eq!(rules.gpu_load.kind, SensorKind::Load);
    assert_eq!(rules.gpu_vendors, vec![GpuVendor::Amd, GpuVendor::Nvidia]);
}

// Both CONFIG_FILE cases share one test so they never race on the variable
#[test]
fn test_config_load_via_config_file_env() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("pcmonitor.toml");
    std::fs::write(&path, VALID_CONFIG).unwrap();

    unsafe { std::env::set_var("CONFIG_FILE", path.to_str().unwrap()) };
    let loaded = AppConfig::load();
    let missing_path = dir.path().join("missing.toml");
    unsafe { std::env::set_var("CONFIG_FILE", missing_path.to_str().unwrap()) };
    let missing = AppConfig::load();
    unsafe { std::env::remove_var("CONFIG_FILE") };

    let config = loaded.expect("load from CONFIG_FILE");
    assert_eq!(config.sampling.interval_secs, 5);
    assert_eq!(config.output.format, OutputFormat::Json);

    let err = missing.unwrap_err();
    assert!(err.to_string().contains("missing.toml"), "{err}");
}

#[test]
fn test_config_validation_rejects_zero_adapter_timeout() {
    let bad = VALID_CONFIG.replace("adapter_timeout_ms = 500", "adapter_timeout_ms = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("adapter_timeout_ms"));
}
