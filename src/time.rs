//! Lap time conversions between display strings and seconds.

use std::sync::LazyLock;

use regex::Regex;

static HOURS_MINUTES_SECONDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+):(\d{1,2}):(\d{1,2}(?:\.\d+)?)$").expect("valid time regex")
});

static MINUTES_SECONDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+):(\d{1,2}(?:\.\d+)?)$").expect("valid time regex"));

const UNITS_PER_SECOND: u64 = 10_000;
const UNITS_PER_MINUTE: u64 = 60 * UNITS_PER_SECOND;
const UNITS_PER_HOUR: u64 = 60 * UNITS_PER_MINUTE;

/// Parse `H:MM:SS.ffff` or `MM:SS.ffff` into seconds.
///
/// The hour form is tried first. Returns `None` if neither form matches.
pub fn parse_time(text: &str) -> Option<f64> {
    let text = text.trim();

    if let Some(caps) = HOURS_MINUTES_SECONDS.captures(text) {
        let hours = caps[1].parse::<f64>().ok()?;
        let minutes = caps[2].parse::<f64>().ok()?;
        let seconds = caps[3].parse::<f64>().ok()?;
        return Some(hours * 3600.0 + minutes * 60.0 + seconds);
    }

    let caps = MINUTES_SECONDS.captures(text)?;
    let minutes = caps[1].parse::<f64>().ok()?;
    let seconds = caps[2].parse::<f64>().ok()?;
    Some(minutes * 60.0 + seconds)
}

/// Render seconds as `H:MM:SS.ffff`, dropping the hour segment when it is zero.
///
/// The value is rounded to a ten-thousandth of a second before it is split so
/// that e.g. `59.99996` becomes `1:00.0000` instead of `0:60.0000`.
pub fn make_time(seconds: f64, separator: &str) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        (seconds * UNITS_PER_SECOND as f64).round() as u64
    } else {
        0
    };

    let hours = total / UNITS_PER_HOUR;
    let minutes = (total % UNITS_PER_HOUR) / UNITS_PER_MINUTE;
    let rest = total % UNITS_PER_MINUTE;
    let whole_seconds = rest / UNITS_PER_SECOND;
    let fraction = rest % UNITS_PER_SECOND;

    if hours > 0 {
        format!("{hours}{separator}{minutes:02}{separator}{whole_seconds:02}.{fraction:04}")
    } else {
        format!("{minutes}{separator}{whole_seconds:02}.{fraction:04}")
    }
}

/// Fixed four decimal formatting with trailing zeros stripped (`2.0000` -> `2`).
pub fn format_decimal(value: f64) -> String {
    let fixed = format!("{value:.4}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}
