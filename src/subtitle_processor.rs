use regex::Regex;
use once_cell::sync::Lazy;

// @module: Subtitle text extraction

// @const: Line starting with an SRT timestamp
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{2}:\d{2}:\d{2}").unwrap()
});

// @checks: Cue index line ("12")
pub fn is_index_line(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| c.is_numeric())
}

// @checks: Timing line ("00:00:01,000 --> 00:00:04,000")
pub fn is_timestamp_line(line: &str) -> bool {
    TIMESTAMP_REGEX.is_match(line)
}

/// Extract the dialogue from SRT content.
///
/// Blank lines, cue numbers and timing lines are dropped; the remaining
/// lines are trimmed and joined with newlines in their original order.
pub fn extract_text(content: &str) -> String {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    content
        .trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !is_index_line(line))
        .filter(|line| !is_timestamp_line(line))
        .collect::<Vec<_>>()
        .join("\n")
}
