//! Time formatting helpers for status texts.

use chrono::{DateTime, Utc};
use coop_types::Timestamp;

/// Format a duration in seconds to a compact string.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

/// Approximate, conversational rendering of a duration ("3 days", "an hour").
pub fn humanize_secs(secs: u64) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;
    const MONTH: u64 = 30 * DAY;
    const YEAR: u64 = 365 * DAY;

    let rounded = |unit: u64| (secs + unit / 2) / unit;

    match secs {
        s if s < 45 => "a few seconds".to_string(),
        s if s < 90 => "a minute".to_string(),
        s if s < 45 * MINUTE => format!("{} minutes", rounded(MINUTE)),
        s if s < 90 * MINUTE => "an hour".to_string(),
        s if s < 22 * HOUR => format!("{} hours", rounded(HOUR)),
        s if s < 36 * HOUR => "a day".to_string(),
        s if s < 26 * DAY => format!("{} days", rounded(DAY)),
        s if s < 45 * DAY => "a month".to_string(),
        s if s < 320 * DAY => format!("{} months", rounded(MONTH)),
        s if s < 548 * DAY => "a year".to_string(),
        _ => format!("{} years", rounded(YEAR)),
    }
}

/// Calendar rendering, e.g. `Monday, March 3rd 2025, 4:05:06 pm` (UTC).
pub fn format_calendar(ts: Timestamp) -> String {
    let secs = i64::try_from(ts.as_secs()).unwrap_or(i64::MAX);
    let Some(dt) = DateTime::<Utc>::from_timestamp(secs, 0) else {
        return ts.to_string();
    };
    let day = dt.format("%-d").to_string();
    let suffix = ordinal_suffix(day.parse().unwrap_or(0));
    format!(
        "{}, {} {}{} {}, {}",
        dt.format("%A"),
        dt.format("%B"),
        day,
        suffix,
        dt.format("%Y"),
        dt.format("%-I:%M:%S %P"),
    )
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}
