//! Size estimation and formatting for storage reports.

/// Estimates the stored size of a serialized value.
///
/// The workbench store keeps strings as UTF-16, so each code unit costs two bytes.
#[must_use]
pub fn utf16_size_estimate(serialized: &str) -> u64 {
    serialized.encode_utf16().count() as u64 * 2
}

/// Formats a byte count as a short human-readable string (`"0 B"`, `"1.5 KB"`).
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        return format!("{bytes} B");
    }
    let rounded = (value * 100.0).round() / 100.0;
    // Trim trailing zeros the way the workbench UI displays sizes: "1.5 KB", "2 MB".
    let text = format!("{rounded:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text} {}", UNITS[unit])
}
