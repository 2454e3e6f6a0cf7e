//! WebVTT caption text to plain transcript lines.

use regex::Regex;
use std::sync::LazyLock;

const HEADER_TOKEN: &str = "WEBVTT";

static CUE_TIMING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*((?:\d+:)?\d{2}:\d{2}\.\d{3})\s+-->\s+((?:\d+:)?\d{2}:\d{2}\.\d{3})")
        .expect("cue timing pattern")
});

static INLINE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("inline tag pattern"));

/// A cue line already rewritten into `start,end` form.
static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+:\d{2}(?::\d{2})?\.\d{3},\d+:\d{2}(?::\d{2})?\.\d{3}$")
        .expect("marker pattern")
});

/// Convert a raw WebVTT document into transcript text.
///
/// Cue timing lines become `start,end` marker lines, inline tags are dropped,
/// blank lines vanish and runs of identical lines collapse into one. The
/// result is a fixed point: normalizing it again returns it unchanged.
pub fn normalize_vtt(raw: &str) -> String {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let all: Vec<&str> = raw.lines().collect();
    let mut lines: Vec<String> = Vec::new();

    for line in &all[header_len(&all)..] {
        let text = INLINE_TAG.replace_all(line, "");
        let line = match timing_marker(&text) {
            Some(marker) => marker,
            None => text.trim().to_string(),
        };

        if line.is_empty() {
            continue;
        }
        if lines.last() == Some(&line) {
            continue;
        }
        lines.push(line);
    }

    lines.join("\n")
}

/// Number of leading lines forming the `WEBVTT` header block.
///
/// The block starts with the bare token (optionally followed by a space or
/// tab and a description) and must end at a blank line or the first cue
/// timing line. Normalized output has neither, so a caption line that happens
/// to start with the token is never taken for a header on a later pass.
fn header_len(lines: &[&str]) -> usize {
    let Some(first) = lines.first() else {
        return 0;
    };
    if !is_header_line(first) {
        return 0;
    }

    for (i, line) in lines.iter().enumerate().skip(1) {
        if line.trim().is_empty() || CUE_TIMING.is_match(line) {
            return i;
        }
        if MARKER.is_match(line.trim()) {
            return 0;
        }
    }
    0
}

fn is_header_line(line: &str) -> bool {
    line.trim_start()
        .strip_prefix(HEADER_TOKEN)
        .is_some_and(|rest| rest.trim_end().is_empty() || rest.starts_with([' ', '\t']))
}

fn timing_marker(line: &str) -> Option<String> {
    let caps = CUE_TIMING.captures(line)?;
    Some(format!(
        "{},{}",
        collapse_leading_zeros(&caps[1]),
        collapse_leading_zeros(&caps[2])
    ))
}

/// `00:00:04.810` -> `0:00:04.810`; only the leading field is touched.
fn collapse_leading_zeros(timestamp: &str) -> String {
    let (head, rest) = timestamp.split_once(':').unwrap_or((timestamp, ""));
    let trimmed = head.trim_start_matches('0');
    let head = if trimmed.is_empty() { "0" } else { trimmed };
    format!("{head}:{rest}")
}
