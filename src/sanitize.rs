//! Path-segment sanitization for untrusted subjects and filenames.
//!
//! Subjects and attachment names come straight from remote mail and may
//! contain anything. Each path segment is cleaned independently and only
//! then joined; sanitizing a composed path would eat its separators.

use std::path::Path;

use uuid::Uuid;

/// Characters that cannot appear in a path segment on common filesystems.
const FORBIDDEN: &[char] = &['"', '\\', '/', ':', '*', '?', '|', '<', '>'];

/// Sanitize one path segment.
///
/// Removes forbidden characters, strips leading/trailing spaces and dots
/// (invalid trailing characters on Windows), and prefixes a random token
/// when the remaining stem is a reserved device name. Returns an empty
/// string for empty or all-forbidden input; callers substitute their own
/// fallback before building a path.
///
/// Idempotent: re-sanitizing a previous result returns it unchanged.
pub fn sanitize_segment(raw: &str) -> String {
    let filtered: String = raw.chars().filter(|c| !FORBIDDEN.contains(c)).collect();
    let trimmed = filtered.trim_matches(|c| c == ' ' || c == '.');

    if trimmed.is_empty() {
        return String::new();
    }

    if is_reserved_name(trimmed) {
        // An 8-hex-char prefix cannot itself form a reserved stem, so the
        // result is stable under re-sanitization.
        let token = Uuid::new_v4().simple().to_string();
        return format!("{}_{}", &token[..8], trimmed);
    }

    trimmed.to_string()
}

/// Whether the segment's stem matches a reserved DOS device name.
///
/// The stem is the name up to the last extension (`con.txt` → `con`),
/// compared case-insensitively.
pub fn is_reserved_name(segment: &str) -> bool {
    let stem = Path::new(segment)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(segment);
    let upper = stem.to_ascii_uppercase();

    matches!(upper.as_str(), "CON" | "PRN" | "AUX" | "NUL")
        || is_numbered_device(&upper, "COM")
        || is_numbered_device(&upper, "LPT")
}

/// `COM1` through `COM9` and `LPT1` through `LPT9`. `COM0` and `COM10`
/// are ordinary names.
fn is_numbered_device(upper: &str, prefix: &str) -> bool {
    match upper.strip_prefix(prefix) {
        Some(rest) => rest.len() == 1 && rest.as_bytes()[0].is_ascii_digit() && rest != "0",
        None => false,
    }
}
