// Linux-specific fallbacks read straight from /proc.

/// Read MemTotal from /proc/meminfo in bytes, for when sysinfo reports 0.
pub(super) fn read_mem_total_linux() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/meminfo").ok()?;
        parse_mem_total(&content)
    }
    #[cfg(not(target_os = "linux"))]
    None
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
/// Parse the "MemTotal: <n> kB" line; returns bytes, or None when absent or zero.
pub(super) fn parse_mem_total(content: &str) -> Option<u64> {
    let line = content.lines().find(|l| l.starts_with("MemTotal:"))?;
    let kb: u64 = line
        .strip_prefix("MemTotal:")?
        .trim()
        .trim_end_matches("kB")
        .trim()
        .parse()
        .ok()?;
    (kb > 0).then(|| kb * 1024)
}
