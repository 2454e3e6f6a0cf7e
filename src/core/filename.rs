const FORBIDDEN: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

pub const ARCHIVE_SUFFIX: &str = ".txt";

/// Replace characters that Windows, macOS or Linux refuse in file names with `-`.
pub fn sanitize_file_name(raw: &str) -> String {
    raw.chars()
        .map(|c| if FORBIDDEN.contains(&c) { '-' } else { c })
        .collect()
}

/// `{date}_{title}.txt`, sanitized. Not truncated.
pub fn archive_file_name(date: &str, title: &str) -> String {
    format!("{}{ARCHIVE_SUFFIX}", sanitize_file_name(&format!("{date}_{title}")))
}
