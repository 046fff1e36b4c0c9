// Human-readable rendering of snapshots for the terminal front-end.

use crate::models::{Metric, Snapshot};
use std::fmt::Write;

const NOT_AVAILABLE: &str = "Not available";
const BYTES_PER_MB: u64 = 1024 * 1024;

/// Multi-line text block, one metric per line.
pub fn render_text(s: &Snapshot) -> String {
    let mut out = String::new();
    let time = chrono::DateTime::from_timestamp_millis(s.timestamp as i64)
        .map(|t| t.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".into());
    let _ = writeln!(out, "--- PC Performance Monitor #{} @ {} ---", s.sequence, time);

    if s.is_degraded(Metric::CpuLoad) {
        let _ = writeln!(out, "CPU Usage: {NOT_AVAILABLE}");
    } else {
        let _ = writeln!(out, "CPU Usage: {:.1}%", s.cpu_usage_display());
    }

    if s.is_degraded(Metric::Memory) && s.available_memory_bytes == 0 {
        let _ = writeln!(out, "Available Memory: {NOT_AVAILABLE}");
    } else {
        let _ = writeln!(
            out,
            "Available Memory: {} MB",
            s.available_memory_bytes / BYTES_PER_MB
        );
    }
    if s.is_degraded(Metric::Memory) {
        let _ = writeln!(out, "Memory Used: {NOT_AVAILABLE}");
    } else {
        let marker = if s.memory_anomaly() { " (!)" } else { "" };
        let _ = writeln!(
            out,
            "Memory Used: {:.1}%{}",
            s.memory_used_percent_display(),
            marker
        );
    }

    if s.is_degraded(Metric::Disk) {
        let _ = writeln!(out, "Disk Read: {NOT_AVAILABLE}");
        let _ = writeln!(out, "Disk Write: {NOT_AVAILABLE}");
    } else {
        let _ = writeln!(out, "Disk Read: {:.2} MB/s", s.disk_read_mb_per_sec);
        let _ = writeln!(out, "Disk Write: {:.2} MB/s", s.disk_write_mb_per_sec);
    }

    let _ = writeln!(out, "CPU Temperature: {}", celsius(s.cpu_temperature_celsius));
    let _ = writeln!(out, "GPU Temperature: {}", celsius(s.gpu_temperature_celsius));
    let _ = write!(out, "GPU Usage: {:.1}%", s.gpu_usage_display());
    out
}

/// One JSON object per line (camelCase fields).
pub fn render_json(s: &Snapshot) -> serde_json::Result<String> {
    serde_json::to_string(s)
}

fn celsius(v: Option<f64>) -> String {
    match v {
        Some(t) => format!("{t:.1}°C"),
        None => NOT_AVAILABLE.into(),
    }
}
