//! Subject and filename filters.
//!
//! Patterns are compiled once, at construction. An absent pattern becomes
//! the wildcard `.*`, so "no filter" and "filter" share one code path.

use regex::Regex;

use crate::error::{Result, ScrapeError};

/// One compiled matcher with prefix semantics.
///
/// The pattern is anchored at the start of the input and need not cover
/// the whole string: `report.*` accepts `report.pdf`, `re` accepts
/// `report.pdf` too. Matching is case-sensitive.
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Regex,
}

impl Matcher {
    /// Compile an optional pattern; `None` matches everything.
    pub fn new(pattern: Option<&str>) -> Result<Self> {
        let pattern = pattern.unwrap_or(".*");
        let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|source| {
            ScrapeError::Pattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        Ok(Self { regex })
    }

    /// Whether a match starts at the beginning of `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Message/part retention decisions for one download run.
#[derive(Debug, Clone)]
pub struct AttachmentFilter {
    subject: Matcher,
    filename: Matcher,
}

impl AttachmentFilter {
    /// Build a filter from optional subject and filename patterns.
    ///
    /// Fails before any network activity if either pattern is invalid.
    pub fn new(subject_pattern: Option<&str>, file_pattern: Option<&str>) -> Result<Self> {
        Ok(Self {
            subject: Matcher::new(subject_pattern)?,
            filename: Matcher::new(file_pattern)?,
        })
    }

    /// Whether a message with this subject should be processed at all.
    pub fn matches_subject(&self, subject: &str) -> bool {
        self.subject.is_match(subject)
    }

    /// Whether a part with this filename should be written.
    pub fn matches_filename(&self, filename: &str) -> bool {
        self.filename.is_match(filename)
    }
}
