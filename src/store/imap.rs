//! IMAP-backed mail store over TLS.
//!
//! Folders are selected with `EXAMINE` and messages fetched with
//! `BODY.PEEK[]`, so a download run never marks anything as read.

use std::net::TcpStream;

use native_tls::{TlsConnector, TlsStream};
use secrecy::ExposeSecret;

use crate::credentials::Credentials;
use crate::error::{Result, ScrapeError};
use crate::store::{MailStore, MessageId};

/// Synchronous IMAP session.
pub struct ImapStore {
    session: imap::Session<TlsStream<TcpStream>>,
}

impl ImapStore {
    /// Connect and authenticate.
    pub fn connect(host: &str, port: u16, credentials: &Credentials) -> Result<Self> {
        let connect_err = |reason: String| ScrapeError::Connect {
            host: host.to_string(),
            port,
            reason,
        };

        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| connect_err(e.to_string()))?;

        tracing::debug!(host, port, "Connecting");
        let client =
            imap::connect((host, port), host, &tls).map_err(|e| connect_err(e.to_string()))?;

        let session = client
            .login(&credentials.username, credentials.password.expose_secret())
            .map_err(|(e, _)| ScrapeError::Auth {
                username: credentials.username.clone(),
                reason: e.to_string(),
            })?;
        tracing::info!(host, user = %credentials.username, "Authenticated");

        Ok(Self { session })
    }

    /// Say goodbye to the server. A failed logout is logged, not fatal.
    pub fn logout(mut self) {
        if let Err(e) = self.session.logout() {
            tracing::warn!(error = %e, "Logout failed");
        }
    }
}

impl MailStore for ImapStore {
    fn select_folder(&mut self, name: &str) -> Result<()> {
        let mailbox = self
            .session
            .examine(name)
            .map_err(|e| ScrapeError::Select {
                folder: name.to_string(),
                reason: e.to_string(),
            })?;
        tracing::info!(folder = name, messages = mailbox.exists, "Selected folder");
        Ok(())
    }

    fn list_message_ids(&mut self) -> Result<Vec<MessageId>> {
        let uids = self
            .session
            .uid_search("ALL")
            .map_err(|e| ScrapeError::List {
                reason: e.to_string(),
            })?;

        // SEARCH returns an unordered set; sort for a stable session order.
        let mut ids: Vec<u32> = uids.into_iter().collect();
        ids.sort_unstable();
        Ok(ids.into_iter().map(MessageId).collect())
    }

    fn fetch_raw(&mut self, id: MessageId) -> Result<Vec<u8>> {
        let fetch_err = |reason: String| ScrapeError::Fetch { id, reason };

        let messages = self
            .session
            .uid_fetch(id.to_string(), "BODY.PEEK[]")
            .map_err(|e| fetch_err(e.to_string()))?;

        let message = messages
            .iter()
            .next()
            .ok_or_else(|| fetch_err("server returned no data for this UID".to_string()))?;
        let body = message
            .body()
            .ok_or_else(|| fetch_err("fetch response has no body section".to_string()))?;

        tracing::trace!(%id, bytes = body.len(), "Fetched message");
        Ok(body.to_vec())
    }
}
