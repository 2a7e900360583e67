//! Number, size and time formatting for terminal output.

use chrono::{DateTime, Utc};

const SIZE_UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

/// Human-readable byte size with one decimal, e.g. `1.5 MB`. Below 1 KiB the
/// exact count is printed.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < SIZE_UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, SIZE_UNITS[unit])
}

/// Cut `text` to `width` characters, marking the cut with `...`.
pub fn truncate_str(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width <= 3 {
        return ".".repeat(width);
    }
    let mut out: String = text.chars().take(width - 3).collect();
    out.push_str("...");
    out
}

/// When an image was added, relative to now. Anything older than a week, or
/// in the future, is shown as a date.
pub fn format_relative_time(timestamp: DateTime<Utc>) -> String {
    let age = Utc::now().signed_duration_since(timestamp);
    let date = || timestamp.format("%Y-%m-%d").to_string();

    match (age.num_seconds(), age.num_minutes(), age.num_hours(), age.num_days()) {
        (s, ..) if s < 0 => date(),
        (_, m, ..) if m < 1 => "just now".to_string(),
        (_, m, h, _) if h < 1 => format!("{} mins ago", m),
        (_, _, h, _) if h < 24 => format!("{}h ago", h),
        (.., d) if d < 7 => format!("{}d ago", d),
        _ => date(),
    }
}

/// Integer with `,` between groups of three digits.
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let groups: Vec<&str> = digits
        .as_bytes()
        .rchunks(3)
        .rev()
        .filter_map(|chunk| std::str::from_utf8(chunk).ok())
        .collect();
    groups.join(",")
}
