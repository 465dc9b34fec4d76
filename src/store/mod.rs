//! Mail store access.
//!
//! The downloader only sees the [`MailStore`] trait; the IMAP session in
//! [`imap`] is one implementation of it. Tests substitute in-memory stores.

use crate::error::Result;

pub mod imap;

/// Opaque identifier for one message within the selected folder.
///
/// Stable for the lifetime of one session; not meaningful across sessions
/// and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub u32);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stateful session bound to one remote mailbox.
///
/// One selected folder at a time; not safe for concurrent use. The caller
/// owns the store and lends it to a downloader for the duration of a run.
pub trait MailStore {
    /// Select the folder that subsequent calls operate on.
    fn select_folder(&mut self, name: &str) -> Result<()>;

    /// List every message identifier in the selected folder.
    ///
    /// The order is implementation-defined but stable within one session.
    fn list_message_ids(&mut self) -> Result<Vec<MessageId>>;

    /// Fetch the complete raw bytes of one message.
    fn fetch_raw(&mut self, id: MessageId) -> Result<Vec<u8>>;
}
