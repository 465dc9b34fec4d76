//! scrapemail: download mail attachments over IMAP.
//!
//! This crate connects to a remote mailbox, walks every message in one
//! folder, and writes attachments matching optional subject and filename
//! patterns to `<output>/<subject>/<filename>`, with both path segments
//! sanitized for safe use on common filesystems.

pub mod config;
pub mod credentials;
pub mod download;
pub mod error;
pub mod filter;
pub mod parser;
pub mod sanitize;
pub mod store;
pub mod writer;
