// GPU readers: nvidia-smi for NVIDIA cards, /sys/class/drm for amdgpu.

use super::{Hardware, HardwareKind, Sensor, SensorKind};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Sensor name used for the GPU-wide temperature and load readings.
pub const GPU_CORE: &str = "GPU Core";

const NVIDIA_QUERY: &str = "--query-gpu=name,temperature.gpu,utilization.gpu";
const DRM_ROOT: &str = "/sys/class/drm";
const AMD_PCI_VENDOR: &str = "0x1002";

/// How long nvidia-smi may run before it is killed.
pub const NVIDIA_SMI_TIMEOUT: Duration = Duration::from_secs(2);

/// Query all NVIDIA GPUs. Errors when nvidia-smi is missing, fails, or does
/// not finish within `NVIDIA_SMI_TIMEOUT`.
pub fn query_nvidia() -> std::io::Result<Vec<Hardware>> {
    let mut cmd = Command::new("nvidia-smi");
    cmd.arg(NVIDIA_QUERY).arg("--format=csv,noheader,nounits");
    let stdout = run_with_deadline(cmd, NVIDIA_SMI_TIMEOUT)?;
    Ok(parse_nvidia_csv(&stdout))
}

/// Runs `cmd` to completion and returns its stdout. The child is killed
/// once `timeout` has passed.
pub fn run_with_deadline(mut cmd: Command, timeout: Duration) -> std::io::Result<String> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;

    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            if !status.success() {
                return Err(std::io::Error::other(format!("exited with {status}")));
            }
            let mut out = Vec::new();
            if let Some(mut stdout) = child.stdout.take() {
                stdout.read_to_end(&mut out)?;
            }
            return Ok(String::from_utf8_lossy(&out).into_owned());
        }
        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("killed after {timeout:?}"),
            ));
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

/// Parse `name, temperature, utilization` lines. "[N/A]" and other
/// non-numeric fields become sensors without a value.
pub fn parse_nvidia_csv(output: &str) -> Vec<Hardware> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split(',').map(str::trim);
            let name = fields.next().filter(|n| !n.is_empty())?;
            let temperature = fields.next().and_then(|v| v.parse::<f32>().ok());
            let utilization = fields.next().and_then(|v| v.parse::<f32>().ok());
            Some(Hardware {
                kind: HardwareKind::GpuNvidia,
                name: name.to_string(),
                sensors: vec![
                    Sensor::new(SensorKind::Temperature, GPU_CORE, temperature),
                    Sensor::new(SensorKind::Load, GPU_CORE, utilization),
                ],
            })
        })
        .collect()
}

/// DRM card directories (`/sys/class/drm/cardN`) backed by an AMD device.
pub fn amd_card_dirs() -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(DRM_ROOT) else {
        return Vec::new();
    };
    let mut cards: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|e| is_card_name(&e.file_name().to_string_lossy()))
        .map(|e| e.path())
        .filter(|p| {
            std::fs::read_to_string(p.join("device/vendor"))
                .map(|v| v.trim() == AMD_PCI_VENDOR)
                .unwrap_or(false)
        })
        .collect();
    cards.sort();
    cards
}

/// "card0" but not connector entries like "card0-DP-1".
fn is_card_name(name: &str) -> bool {
    name.strip_prefix("card")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Read load and temperatures of one amdgpu card.
pub fn read_amd_card(card: &Path) -> Hardware {
    let device = card.join("device");
    let mut sensors = Vec::new();

    let busy = std::fs::read_to_string(device.join("gpu_busy_percent"))
        .ok()
        .and_then(|s| s.trim().parse::<f32>().ok());
    sensors.push(Sensor::new(SensorKind::Load, GPU_CORE, busy));

    if let Ok(hwmons) = std::fs::read_dir(device.join("hwmon")) {
        for hwmon in hwmons.filter_map(|e| e.ok()).map(|e| e.path()) {
            for index in 1..=8 {
                let input = hwmon.join(format!("temp{index}_input"));
                let Ok(raw) = std::fs::read_to_string(&input) else {
                    continue;
                };
                let label = std::fs::read_to_string(hwmon.join(format!("temp{index}_label")))
                    .map(|l| l.trim().to_string())
                    .unwrap_or_else(|_| format!("temp{index}"));
                sensors.push(Sensor::new(
                    SensorKind::Temperature,
                    label,
                    parse_millidegrees(&raw),
                ));
            }
        }
    }

    let name = std::fs::read_to_string(device.join("product_name"))
        .map(|n| n.trim().to_string())
        .ok()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| {
            card.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "amdgpu".into())
        });

    Hardware {
        kind: HardwareKind::GpuAmd,
        name,
        sensors,
    }
}

/// hwmon temperatures are in millidegrees Celsius.
pub fn parse_millidegrees(raw: &str) -> Option<f32> {
    raw.trim().parse::<i64>().ok().map(|m| m as f32 / 1000.0)
}
