//! Centralized error types for scrapemail.

use std::path::PathBuf;

use thiserror::Error;

use crate::store::MessageId;

/// All errors produced by the scrapemail library.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// Bad or missing configuration input, surfaced before any network activity.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A subject or filename pattern failed to compile.
    #[error("Invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },

    /// The mail server could not be reached.
    #[error("Cannot connect to {host}:{port}: {reason}")]
    Connect {
        host: String,
        port: u16,
        reason: String,
    },

    /// The server rejected the login.
    #[error("Login failed for '{username}': {reason}")]
    Auth { username: String, reason: String },

    /// The requested folder could not be selected.
    #[error("Cannot select folder '{folder}': {reason}")]
    Select { folder: String, reason: String },

    /// Listing the selected folder failed.
    #[error("Cannot list messages: {reason}")]
    List { reason: String },

    /// Fetching one message failed (stale or unavailable identifier).
    #[error("Cannot fetch message {id}: {reason}")]
    Fetch { id: MessageId, reason: String },

    /// The fetched bytes are not a parseable mail message.
    #[error("Message {id} is not a parseable mail message")]
    Malformed { id: MessageId },

    /// Writing an attachment to disk failed.
    #[error("Cannot write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias for `Result<T, ScrapeError>`.
pub type Result<T> = std::result::Result<T, ScrapeError>;

impl ScrapeError {
    /// Create a `Write` variant from a path and an `io::Error`.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}
