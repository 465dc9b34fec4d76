//! Write attachments to `<root>/<subject>/<filename>`.
//!
//! Both path segments are sanitized independently before joining. An
//! existing file at the destination is overwritten without warning
//! (last-write-wins; no dedup, no versioning).

use std::path::Path;

use crate::error::{Result, ScrapeError};
use crate::sanitize::sanitize_segment;

/// Folder name used when a subject sanitizes to nothing.
pub const FALLBACK_SUBJECT_DIR: &str = "no-subject";
/// File name used when an attachment name sanitizes to nothing.
pub const FALLBACK_FILE_NAME: &str = "attachment";

/// One attachment ready to be written: sanitized segments plus payload.
///
/// Constructed immediately before writing; never cached.
pub struct Attachment<'a> {
    pub subject_dir: String,
    pub file_name: String,
    pub payload: &'a [u8],
}

impl<'a> Attachment<'a> {
    /// Sanitize both segments and substitute fallbacks for empty results.
    pub fn new(subject: &str, filename: &str, payload: &'a [u8]) -> Self {
        Self {
            subject_dir: fallback_if_empty(sanitize_segment(subject), FALLBACK_SUBJECT_DIR),
            file_name: fallback_if_empty(sanitize_segment(filename), FALLBACK_FILE_NAME),
            payload,
        }
    }
}

/// Write one attachment under `root`, creating directories as needed.
///
/// Returns the number of bytes written, always `payload.len()` on success.
pub fn write_attachment(root: &Path, attachment: &Attachment<'_>) -> Result<u64> {
    let dir = root.join(&attachment.subject_dir);
    std::fs::create_dir_all(&dir).map_err(|e| ScrapeError::write(&dir, e))?;

    let path = dir.join(&attachment.file_name);
    std::fs::write(&path, attachment.payload).map_err(|e| ScrapeError::write(&path, e))?;

    tracing::debug!(
        path = %path.display(),
        bytes = attachment.payload.len(),
        "Wrote attachment"
    );
    Ok(attachment.payload.len() as u64)
}

fn fallback_if_empty(segment: String, fallback: &str) -> String {
    if segment.is_empty() {
        fallback.to_string()
    } else {
        segment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_creates_directories_and_reports_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let att = Attachment::new("Invoice 2024", "report.pdf", b"Hello PDF");

        let written = write_attachment(tmp.path(), &att).unwrap();
        assert_eq!(written, 9);

        let path = tmp.path().join("Invoice 2024").join("report.pdf");
        assert_eq!(std::fs::read(&path).unwrap(), b"Hello PDF");
    }

    #[test]
    fn test_overwrite_is_last_write_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let first = Attachment::new("Invoice", "report.pdf", b"old contents");
        let second = Attachment::new("Invoice", "report.pdf", b"new");

        write_attachment(tmp.path(), &first).unwrap();
        let written = write_attachment(tmp.path(), &second).unwrap();
        assert_eq!(written, 3);

        let path = tmp.path().join("Invoice").join("report.pdf");
        assert_eq!(std::fs::read(&path).unwrap(), b"new");

        // No versioned sibling appears.
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_segments_are_sanitized_independently() {
        let att = Attachment::new("Re: fwd/status?", "a<b>.txt", b"x");
        // Forbidden characters are gone from both segments.
        assert_eq!(att.subject_dir, "Re fwdstatus");
        assert_eq!(att.file_name, "ab.txt");
    }

    #[test]
    fn test_empty_segments_get_fallbacks() {
        let att = Attachment::new("", "***", b"x");
        assert_eq!(att.subject_dir, FALLBACK_SUBJECT_DIR);
        assert_eq!(att.file_name, FALLBACK_FILE_NAME);

        let tmp = tempfile::tempdir().unwrap();
        write_attachment(tmp.path(), &att).unwrap();
        let path = tmp.path().join(FALLBACK_SUBJECT_DIR).join(FALLBACK_FILE_NAME);
        assert!(path.exists());
    }

    #[test]
    fn test_write_error_names_the_path() {
        let tmp = tempfile::tempdir().unwrap();
        // A regular file where the subject directory should go.
        std::fs::write(tmp.path().join("Invoice"), b"in the way").unwrap();

        let att = Attachment::new("Invoice", "report.pdf", b"data");
        let err = write_attachment(tmp.path(), &att).unwrap_err();
        match err {
            crate::error::ScrapeError::Write { path, .. } => {
                assert!(path.ends_with("Invoice") || path.ends_with("report.pdf"));
            }
            other => panic!("expected Write error, got {other:?}"),
        }
    }
}
