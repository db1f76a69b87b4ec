//! Pure stats math: CPU percentage from counter deltas, memory readouts,
//! and human-readable byte/uptime formatting. No state, no I/O.

/// Cumulative CPU counters at one point in time, as reported by the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuCounters {
    pub total_usage: u64,
    pub system_usage: u64,
}

/// The pre/current counter pair the engine supplies in a single stats call.
/// CPU percentage is a rate, so both snapshots are required; we never have
/// to retain a previous sample across calls ourselves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawStatsPair {
    pub current: CpuCounters,
    pub previous: CpuCounters,
    /// Count of per-core usage entries reported. 1 when unavailable.
    pub num_cores: u64,
}

/// Formatted memory usage/limit plus the usage percentage.
/// `percent` is None when the limit is zero or unreported; absence must be
/// distinguishable from an actual 0% so callers don't render a misleading
/// figure.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryReadout {
    pub usage: String,
    pub limit: String,
    pub percent: Option<f64>,
}

/// CPU percentage from a pre/current counter pair. Returns 0.0 whenever
/// either delta is non-positive; malformed or zeroed input degrades to 0.0
/// rather than failing.
pub fn compute_cpu_percent(pair: &RawStatsPair) -> f64 {
    let cpu_delta = pair.current.total_usage as f64 - pair.previous.total_usage as f64;
    let system_delta = pair.current.system_usage as f64 - pair.previous.system_usage as f64;

    if system_delta > 0.0 && cpu_delta > 0.0 {
        let num_cores = pair.num_cores.max(1) as f64;
        (cpu_delta / system_delta) * num_cores * 100.0
    } else {
        0.0
    }
}

pub fn compute_memory(usage_bytes: u64, limit_bytes: u64) -> MemoryReadout {
    let percent = if limit_bytes > 0 {
        Some(usage_bytes as f64 / limit_bytes as f64 * 100.0)
    } else {
        None
    };
    MemoryReadout {
        usage: format_bytes(usage_bytes),
        limit: format_bytes(limit_bytes),
        percent,
    }
}

/// Format a byte count: GB with two decimals, MB with one, else KB with one.
pub fn format_bytes(bytes: u64) -> String {
    const GIB: u64 = 1024 * 1024 * 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes >= GIB {
        format!("{:.2}GB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1}MB", bytes as f64 / MIB as f64)
    } else {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    }
}

/// Uptime between two unix timestamps, truncated: "{d}d{h}h" when at least a
/// day old, "{h}h{m}m" when at least an hour, else "{m}m". A creation time
/// in the future clamps to zero.
pub fn format_uptime(created_ts: i64, now_ts: i64) -> String {
    let secs = (now_ts - created_ts).max(0) as u64;
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;

    if days > 0 {
        format!("{}d{}h", days, hours)
    } else if hours > 0 {
        format!("{}h{}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}
