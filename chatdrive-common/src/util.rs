//! Small string and duration helpers.

use std::time::Duration;

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Operates on character boundaries, so multi-byte text is never split.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            let truncated = &s[..idx];
            format!("{}...", truncated.trim_end())
        }
        None => s.to_string(),
    }
}

/// Parse a duration string like "500ms", "30s", "5m", "1h".
///
/// A bare number is taken as seconds, so "0" parses to a zero duration.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Empty duration string".into());
    }

    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (num_str, unit) = s.split_at(split);
    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: {num_str}"))?;

    let secs = match unit {
        "" | "s" => num,
        "ms" => num / 1000.0,
        "m" => num * 60.0,
        "h" => num * 3600.0,
        _ => return Err(format!("Unknown unit: {unit}")),
    };

    Duration::try_from_secs_f64(secs).map_err(|e| format!("Duration out of range: {e}"))
}
