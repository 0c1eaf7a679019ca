//! Human-readable durations and sizes for listings.

use chrono::{DateTime, Duration, Utc};

/// Formats a duration the way `docker images` does ("2 hours", "About a minute").
pub fn human_duration(duration: Duration) -> String {
    let seconds = duration.num_seconds().max(0);
    let minutes = seconds / 60;
    // Hours are rounded to the nearest hour before bucketing.
    let hours = (seconds + 1800) / 3600;

    if seconds < 1 {
        "Less than a second".to_string()
    } else if seconds == 1 {
        "1 second".to_string()
    } else if seconds < 60 {
        format!("{} seconds", seconds)
    } else if minutes == 1 {
        "About a minute".to_string()
    } else if minutes < 60 {
        format!("{} minutes", minutes)
    } else if hours == 1 {
        "About an hour".to_string()
    } else if hours < 48 {
        format!("{} hours", hours)
    } else if hours < 24 * 7 * 2 {
        format!("{} days", hours / 24)
    } else if hours < 24 * 30 * 2 {
        format!("{} weeks", hours / 24 / 7)
    } else if hours < 24 * 365 * 2 {
        format!("{} months", hours / 24 / 30)
    } else {
        format!("{} years", seconds / 3600 / 24 / 365)
    }
}

pub fn time_since(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    format!("{} ago", human_duration(now - created))
}

const BYTE_UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

/// Binary units with one decimal, e.g. `128.5 MiB`. Negative sizes are 0.
pub fn human_size(size: i64) -> String {
    let mut value = size.max(0) as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, BYTE_UNITS[unit])
}
