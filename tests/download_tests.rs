//! Integration tests for the download pipeline over an in-memory mail store.

use std::io::Write;

use assert_fs::prelude::*;
use predicates::prelude::*;

use scrapemail::credentials::Credentials;
use scrapemail::download::{CancelToken, Downloader};
use scrapemail::error::{Result, ScrapeError};
use scrapemail::filter::AttachmentFilter;
use scrapemail::store::{MailStore, MessageId};

/// In-memory mail store double; identifiers are assigned 1..=n.
struct MemoryStore {
    messages: Vec<(MessageId, Vec<u8>)>,
    /// Extra identifier listed but not fetchable, as after an expunge.
    stale: Option<MessageId>,
}

impl MemoryStore {
    fn new(messages: Vec<Vec<u8>>) -> Self {
        Self {
            messages: messages
                .into_iter()
                .enumerate()
                .map(|(i, raw)| (MessageId(i as u32 + 1), raw))
                .collect(),
            stale: None,
        }
    }
}

impl MailStore for MemoryStore {
    fn select_folder(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn list_message_ids(&mut self) -> Result<Vec<MessageId>> {
        let mut ids: Vec<MessageId> = self.messages.iter().map(|(id, _)| *id).collect();
        ids.extend(self.stale);
        Ok(ids)
    }

    fn fetch_raw(&mut self, id: MessageId) -> Result<Vec<u8>> {
        self.messages
            .iter()
            .find(|(mid, _)| *mid == id)
            .map(|(_, raw)| raw.clone())
            .ok_or_else(|| ScrapeError::Fetch {
                id,
                reason: "unknown identifier".to_string(),
            })
    }
}

/// Build a multipart message; attachments are (filename, base64 payload).
fn message(subject: Option<&str>, attachments: &[(&str, &str)]) -> Vec<u8> {
    let mut raw = Vec::new();
    writeln!(raw, "From: sender@example.com\r").unwrap();
    writeln!(raw, "To: recipient@example.com\r").unwrap();
    if let Some(subject) = subject {
        writeln!(raw, "Subject: {subject}\r").unwrap();
    }
    writeln!(raw, "MIME-Version: 1.0\r").unwrap();
    writeln!(raw, "Content-Type: multipart/mixed; boundary=\"sep\"\r").unwrap();
    writeln!(raw, "\r").unwrap();
    writeln!(raw, "--sep\r").unwrap();
    writeln!(raw, "Content-Type: text/plain\r").unwrap();
    writeln!(raw, "\r").unwrap();
    writeln!(raw, "See attached.\r").unwrap();
    for (name, payload) in attachments {
        writeln!(raw, "--sep\r").unwrap();
        writeln!(
            raw,
            "Content-Type: application/octet-stream; name=\"{name}\"\r"
        )
        .unwrap();
        writeln!(raw, "Content-Disposition: attachment; filename=\"{name}\"\r").unwrap();
        writeln!(raw, "Content-Transfer-Encoding: base64\r").unwrap();
        writeln!(raw, "\r").unwrap();
        writeln!(raw, "{payload}\r").unwrap();
    }
    writeln!(raw, "--sep--\r").unwrap();
    raw
}

// Base64 fixtures: "Hello PDF" (9 bytes), "PNG data" (8 bytes), "Hello" (5 bytes).
const PDF: &str = "SGVsbG8gUERG";
const PNG: &str = "UE5HIGRhdGE=";
const TXT: &str = "SGVsbG8=";

fn wildcard() -> AttachmentFilter {
    AttachmentFilter::new(None, None).unwrap()
}

// ─── Test 1: Filename pattern keeps only the matching part ──────────

#[test]
fn test_filename_pattern_selects_one_attachment() {
    let root = assert_fs::TempDir::new().unwrap();
    let mut store = MemoryStore::new(vec![message(
        Some("Invoice 2024"),
        &[("report.pdf", PDF), ("image.png", PNG)],
    )]);

    let filter = AttachmentFilter::new(None, Some("report.*")).unwrap();
    let stats = Downloader::new(&mut store, filter, root.path())
        .download_attachments(None)
        .unwrap();

    assert_eq!(stats.count, 1);
    assert_eq!(stats.total_bytes, 9);
    root.child("Invoice 2024/report.pdf").assert("Hello PDF");
    root.child("Invoice 2024/image.png")
        .assert(predicate::path::missing());
}

// ─── Test 2: No filters → every named part is written ───────────────

#[test]
fn test_wildcard_downloads_everything() {
    let root = assert_fs::TempDir::new().unwrap();
    let mut store = MemoryStore::new(vec![
        message(Some("Invoice 2024"), &[("report.pdf", PDF), ("image.png", PNG)]),
        message(Some("Notes"), &[("a.txt", TXT)]),
    ]);

    let stats = Downloader::new(&mut store, wildcard(), root.path())
        .download_attachments(None)
        .unwrap();

    assert_eq!(stats.count, 3);
    assert_eq!(stats.total_bytes, 9 + 8 + 5);
    root.child("Invoice 2024/report.pdf")
        .assert(predicate::path::exists());
    root.child("Invoice 2024/image.png")
        .assert(predicate::path::exists());
    root.child("Notes/a.txt").assert("Hello");
}

// ─── Test 3: Non-matching subject skips the whole message ───────────

#[test]
fn test_subject_mismatch_means_no_side_effects() {
    let root = assert_fs::TempDir::new().unwrap();
    // The attachment would match any filename filter; the subject keeps it out.
    let mut store = MemoryStore::new(vec![
        message(Some("Newsletter"), &[("report.pdf", PDF)]),
        message(Some("Spam"), &[("report2.pdf", PDF)]),
    ]);

    let filter = AttachmentFilter::new(Some("Invoice"), None).unwrap();
    let stats = Downloader::new(&mut store, filter, root.path())
        .download_attachments(None)
        .unwrap();

    assert_eq!(stats.count, 0);
    assert_eq!(stats.total_bytes, 0);
    let entries = std::fs::read_dir(root.path()).unwrap().count();
    assert_eq!(entries, 0, "a filtered-out run must leave the root untouched");
}

// ─── Test 4: Missing subject matches the wildcard, lands in fallback ─

#[test]
fn test_missing_subject_uses_fallback_folder() {
    let root = assert_fs::TempDir::new().unwrap();
    let mut store = MemoryStore::new(vec![message(None, &[("data.bin", TXT)])]);

    let stats = Downloader::new(&mut store, wildcard(), root.path())
        .download_attachments(None)
        .unwrap();

    assert_eq!(stats.count, 1);
    root.child("no-subject/data.bin").assert("Hello");
}

// ─── Test 5: Missing subject does not match a literal pattern ───────

#[test]
fn test_missing_subject_fails_literal_pattern() {
    let root = assert_fs::TempDir::new().unwrap();
    let mut store = MemoryStore::new(vec![message(None, &[("data.bin", TXT)])]);

    let filter = AttachmentFilter::new(Some("Invoice"), None).unwrap();
    let stats = Downloader::new(&mut store, filter, root.path())
        .download_attachments(None)
        .unwrap();

    assert_eq!(stats.count, 0);
}

// ─── Test 6: Hostile subjects and names sanitize into the layout ────

#[test]
fn test_hostile_segments_are_sanitized() {
    let root = assert_fs::TempDir::new().unwrap();
    let mut store = MemoryStore::new(vec![message(
        Some("Re: invoices/2024?"),
        &[("bad:name*.txt", TXT)],
    )]);

    let stats = Downloader::new(&mut store, wildcard(), root.path())
        .download_attachments(None)
        .unwrap();

    assert_eq!(stats.count, 1);
    root.child("Re invoices2024/badname.txt").assert("Hello");
}

// ─── Test 7: Unparseable message aborts and names the identifier ────

#[test]
fn test_unparseable_message_aborts_run() {
    let root = assert_fs::TempDir::new().unwrap();
    let mut store = MemoryStore::new(vec![
        message(Some("First"), &[("a.txt", TXT)]),
        Vec::new(), // not a mail message
        message(Some("Third"), &[("c.txt", TXT)]),
    ]);

    let err = Downloader::new(&mut store, wildcard(), root.path())
        .download_attachments(None)
        .unwrap_err();

    match err {
        ScrapeError::Malformed { id } => assert_eq!(id, MessageId(2)),
        other => panic!("expected Malformed error, got {other:?}"),
    }

    // Attachments written before the abort stay in place; later ones never happen.
    root.child("First/a.txt").assert(predicate::path::exists());
    root.child("Third/c.txt").assert(predicate::path::missing());
}

// ─── Test 8: Skip-malformed mode warns and continues ────────────────

#[test]
fn test_skip_malformed_continues_past_bad_message() {
    let root = assert_fs::TempDir::new().unwrap();
    let mut store = MemoryStore::new(vec![
        message(Some("First"), &[("a.txt", TXT)]),
        Vec::new(),
        message(Some("Third"), &[("c.txt", TXT)]),
    ]);

    let stats = Downloader::new(&mut store, wildcard(), root.path())
        .with_skip_malformed(true)
        .download_attachments(None)
        .unwrap();

    assert_eq!(stats.count, 2);
    root.child("First/a.txt").assert(predicate::path::exists());
    root.child("Third/c.txt").assert(predicate::path::exists());
}

// ─── Test 9: A stale identifier aborts with a fetch error ───────────

#[test]
fn test_stale_identifier_aborts_run() {
    let root = assert_fs::TempDir::new().unwrap();
    let mut store = MemoryStore::new(vec![message(Some("First"), &[("a.txt", TXT)])]);
    store.stale = Some(MessageId(99));

    let err = Downloader::new(&mut store, wildcard(), root.path())
        .download_attachments(None)
        .unwrap_err();

    match err {
        ScrapeError::Fetch { id, .. } => assert_eq!(id, MessageId(99)),
        other => panic!("expected Fetch error, got {other:?}"),
    }
    root.child("First/a.txt").assert(predicate::path::exists());
}

// ─── Test 10: Cancellation stops between messages ───────────────────

#[test]
fn test_cancellation_keeps_only_earlier_messages() {
    let root = assert_fs::TempDir::new().unwrap();
    let mut store = MemoryStore::new(vec![
        message(Some("First"), &[("a.txt", TXT)]),
        message(Some("Second"), &[("b.txt", TXT)]),
    ]);

    let cancel = CancelToken::new();
    let from_callback = cancel.clone();
    let stats = Downloader::new(&mut store, wildcard(), root.path())
        .with_cancel_token(cancel)
        .download_attachments(Some(&move |current, _total| {
            // Simulates Ctrl-C arriving while the first message is processed.
            if current >= 1 {
                from_callback.cancel();
            }
        }))
        .unwrap();

    assert_eq!(stats.count, 1);
    root.child("First/a.txt").assert(predicate::path::exists());
    root.child("Second/b.txt").assert(predicate::path::missing());
}

// ─── Test 11: Progress reports processed and total counts ───────────

#[test]
fn test_progress_reports_each_message() {
    let root = assert_fs::TempDir::new().unwrap();
    let mut store = MemoryStore::new(vec![
        message(Some("One"), &[]),
        message(Some("Two"), &[]),
        message(Some("Three"), &[]),
    ]);

    let seen = std::sync::Mutex::new(Vec::new());
    Downloader::new(&mut store, wildcard(), root.path())
        .download_attachments(Some(&|current, total| {
            seen.lock().unwrap().push((current, total));
        }))
        .unwrap();

    let seen = seen.into_inner().unwrap();
    assert_eq!(seen, vec![(0, 3), (1, 3), (2, 3), (3, 3)]);
}

// ─── Test 12: A failed run hands the store back for teardown ────────

#[test]
fn test_store_stays_usable_after_failed_run() {
    let root = assert_fs::TempDir::new().unwrap();
    let mut store = MemoryStore::new(vec![Vec::new()]);

    Downloader::new(&mut store, wildcard(), root.path())
        .download_attachments(None)
        .unwrap_err();

    // The borrow ends with the run, so the caller can still talk to the
    // server (and log out of a real session).
    let ids = store.list_message_ids().unwrap();
    assert_eq!(ids, vec![MessageId(1)]);
}

// ─── Test 13: Credentials file accepts the documented key aliases ───

#[test]
fn test_credentials_file_roundtrip() {
    let dir = assert_fs::TempDir::new().unwrap();
    let file = dir.child("creds.json");
    file.write_str(r#"{"email": "user@example.com", "pass": "hunter2"}"#)
        .unwrap();

    let creds = Credentials::from_file(file.path()).unwrap();
    assert_eq!(creds.username, "user@example.com");

    let missing = dir.child("half.json");
    missing.write_str(r#"{"username": "user@example.com"}"#).unwrap();
    let err = Credentials::from_file(missing.path()).unwrap_err();
    match err {
        ScrapeError::Config(msg) => assert!(msg.contains("password"), "got: {msg}"),
        other => panic!("expected Config error, got {other:?}"),
    }
}
