/// Bucket label formatting and its inverse.
///
/// Sizes below 1 KB render as whole bytes (`"300 B"`); anything larger
/// renders as kilobytes rounded up (`"1025 B"` becomes `"2 KB"`). Parsing
/// also accepts `MB` so labels written by other tools round-trip.
use crate::error::HistogramError;

const KB: u64 = 1024;
const MB: u64 = KB * 1024;

/// Separator between the two ends of a range label.
pub const RANGE_SEPARATOR: &str = " - ";

/// Format one end of a bucket range.
pub fn format_label_size(bytes: u64) -> String {
    if bytes >= KB {
        format!("{} KB", bytes.div_ceil(KB))
    } else {
        format!("{bytes} B")
    }
}

/// Format a full `start - end` range label.
pub fn format_range_label(start: u64, end: u64) -> String {
    format!(
        "{}{RANGE_SEPARATOR}{}",
        format_label_size(start),
        format_label_size(end)
    )
}

/// Parse a single size (`"300 B"`, `"2 KB"`, `"1 MB"` or a bare number) into bytes.
pub fn parse_label_size(text: &str) -> Result<u64, HistogramError> {
    let text = text.trim();
    let malformed = || HistogramError::MalformedLabel(text.to_string());

    let (number, multiplier) = if let Some(n) = text.strip_suffix("KB") {
        (n, KB)
    } else if let Some(n) = text.strip_suffix("MB") {
        (n, MB)
    } else if let Some(n) = text.strip_suffix('B') {
        (n, 1)
    } else {
        (text, 1)
    };

    number
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|value| value.checked_mul(multiplier))
        .ok_or_else(malformed)
}

/// Parse a `start - end` label back into byte bounds.
pub fn parse_range_label(label: &str) -> Result<(u64, u64), HistogramError> {
    let (start, end) = label
        .split_once(RANGE_SEPARATOR)
        .ok_or_else(|| HistogramError::MalformedLabel(label.to_string()))?;
    Ok((parse_label_size(start)?, parse_label_size(end)?))
}
