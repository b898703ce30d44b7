//! Human-readable rendering for command output.

const KIB: f64 = 1024.0;

pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / KIB;
    let mut unit = 0;
    while value >= KIB && unit < UNITS.len() - 1 {
        value /= KIB;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// `1:02:03`, or `2:03` under an hour.
pub fn human_duration(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

pub fn human_speed(kibps: f64) -> String {
    if kibps >= KIB {
        format!("{:.2} MiB/s", kibps / KIB)
    } else {
        format!("{kibps:.0} KiB/s")
    }
}

pub fn or_dash<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// `12.0 MiB / 40.0 MiB (30%)`
pub fn progress_line(percent: u8, downloaded: u64, total: Option<u64>) -> String {
    match total {
        Some(t) => format!("{} / {} ({percent}%)", human_bytes(downloaded), human_bytes(t)),
        None => format!("{} ({percent}%)", human_bytes(downloaded)),
    }
}

/// First 8 characters of a UUID; enough to tell jobs apart in a table.
pub fn short_id(id: &uuid::Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}
