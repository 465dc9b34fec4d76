//! The download run: walk the selected folder and write every attachment
//! that passes the filters, keeping a running tally.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, ScrapeError};
use crate::filter::AttachmentFilter;
use crate::parser::{self, ParsedMessage};
use crate::store::{MailStore, MessageId};
use crate::writer::{write_attachment, Attachment};

/// Aggregate result of one download run.
///
/// Accumulated incrementally while the run streams, never recomputed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadStats {
    /// Attachments written.
    pub count: u64,
    /// Payload bytes written.
    pub total_bytes: u64,
}

/// Cooperative cancellation flag, checked between messages.
///
/// Clones share one flag, so a signal handler can hold one clone while the
/// downloader polls another. Cancellation never interrupts a message mid-way;
/// files already written stay in place.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop before the next message.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Walks every message in the selected folder and writes matching attachments.
///
/// Borrows the mail store for the duration of one run; messages are processed
/// strictly one at a time and no payload is retained after its write.
pub struct Downloader<'a, S: MailStore> {
    store: &'a mut S,
    filter: AttachmentFilter,
    dest_root: PathBuf,
    skip_malformed: bool,
    cancel: CancelToken,
}

impl<'a, S: MailStore> Downloader<'a, S> {
    pub fn new(store: &'a mut S, filter: AttachmentFilter, dest_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            filter,
            dest_root: dest_root.into(),
            skip_malformed: false,
            cancel: CancelToken::new(),
        }
    }

    /// Skip unparseable messages with a warning instead of aborting the run.
    pub fn with_skip_malformed(mut self, skip: bool) -> Self {
        self.skip_malformed = skip;
        self
    }

    /// Poll an externally controlled cancellation token between messages.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Download every matching attachment from the selected folder.
    ///
    /// The progress callback receives `(processed, total)`. A fetch, parse,
    /// or write failure aborts the whole run; attachments already written
    /// stay on disk. Cancellation stops between messages and returns the
    /// partial stats as success.
    pub fn download_attachments(
        &mut self,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> Result<DownloadStats> {
        let ids = self.store.list_message_ids()?;
        let total = ids.len() as u64;
        let mut stats = DownloadStats::default();

        tracing::info!(messages = total, "Starting download");

        for (i, &id) in ids.iter().enumerate() {
            if let Some(cb) = progress {
                cb(i as u64, total);
            }
            if self.cancel.is_cancelled() {
                tracing::info!(processed = i, total, "Download cancelled");
                return Ok(stats);
            }

            let raw = self.store.fetch_raw(id)?;
            match parser::parse(&raw) {
                Some(message) => self.process_message(id, &message, &mut stats)?,
                None if self.skip_malformed => {
                    tracing::warn!(%id, "Skipping unparseable message");
                }
                None => return Err(ScrapeError::Malformed { id }),
            }
        }

        if let Some(cb) = progress {
            cb(total, total);
        }

        tracing::info!(
            count = stats.count,
            total_bytes = stats.total_bytes,
            "Download finished"
        );
        Ok(stats)
    }

    fn process_message(
        &self,
        id: MessageId,
        message: &ParsedMessage<'_>,
        stats: &mut DownloadStats,
    ) -> Result<()> {
        let subject = message.subject();
        if !self.filter.matches_subject(subject) {
            // Skipped before the part walk, so nothing gets decoded.
            tracing::debug!(%id, subject, "Subject filter skipped message");
            return Ok(());
        }

        for part in message.parts() {
            let filename = match part.filename {
                Some(name) if !name.is_empty() => name,
                _ => continue,
            };
            if !self.filter.matches_filename(filename) {
                tracing::debug!(%id, filename, "Filename filter skipped part");
                continue;
            }

            let attachment = Attachment::new(subject, filename, part.payload);
            stats.total_bytes += write_attachment(&self.dest_root, &attachment)?;
            stats.count += 1;
        }
        Ok(())
    }
}
