//! Account credentials and the ways to obtain them.
//!
//! Precedence: an explicit username (password prompted), then a JSON
//! credentials file, then an interactive prompt for both. Passwords stay
//! in [`SecretString`] from acquisition to login and never reach logs.

use std::io::{BufRead, Write};
use std::path::Path;

use secrecy::SecretString;

use crate::error::{Result, ScrapeError};

/// Keys recognized for the username field, probed in order.
const USERNAME_KEYS: [&str; 3] = ["username", "user", "email"];
/// Keys recognized for the password field, probed in order.
const PASSWORD_KEYS: [&str; 2] = ["password", "pass"];

/// One account login.
///
/// Debug output shows the username only; the password renders redacted.
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    /// Load from a JSON credentials file.
    ///
    /// The username is taken from the first present of `username`, `user`,
    /// `email`; the password from `password` or `pass`. Missing either is a
    /// configuration error.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ScrapeError::Config(format!(
                "cannot read credentials file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json(&contents)
            .map_err(|e| ScrapeError::Config(format!("in '{}': {e}", path.display())))
    }

    /// Parse credentials from a JSON object string.
    fn from_json(contents: &str) -> std::result::Result<Self, String> {
        let value: serde_json::Value =
            serde_json::from_str(contents).map_err(|e| format!("not valid JSON: {e}"))?;

        let username = lookup(&value, &USERNAME_KEYS)
            .ok_or_else(|| format!("no username key (expected one of {USERNAME_KEYS:?})"))?;
        let password = lookup(&value, &PASSWORD_KEYS)
            .ok_or_else(|| format!("no password key (expected one of {PASSWORD_KEYS:?})"))?;

        Ok(Self {
            username: username.to_string(),
            password: SecretString::from(password.to_string()),
        })
    }

    /// Prompt for the password of a known username.
    pub fn for_username(username: String) -> Result<Self> {
        if username.is_empty() {
            return Err(ScrapeError::Config("username must not be empty".into()));
        }
        let password = prompt_password(&username)?;
        Ok(Self { username, password })
    }

    /// Prompt for both username and password.
    pub fn from_prompt() -> Result<Self> {
        let username = prompt_username()?;
        let password = prompt_password(&username)?;
        Ok(Self { username, password })
    }
}

/// Resolve credentials with the documented precedence.
pub fn resolve(username: Option<String>, file: Option<&Path>) -> Result<Credentials> {
    if let Some(username) = username {
        tracing::debug!(user = %username, "Using username from the command line");
        return Credentials::for_username(username);
    }
    if let Some(path) = file {
        tracing::debug!(path = %path.display(), "Loading credentials file");
        return Credentials::from_file(path);
    }
    Credentials::from_prompt()
}

fn lookup<'v>(value: &'v serde_json::Value, keys: &[&str]) -> Option<&'v str> {
    keys.iter().find_map(|k| value.get(k).and_then(|v| v.as_str()))
}

fn prompt_username() -> Result<String> {
    let prompt_err =
        |e: std::io::Error| ScrapeError::Config(format!("cannot prompt for username: {e}"));

    eprint!("Username: ");
    std::io::stderr().flush().map_err(prompt_err)?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line).map_err(prompt_err)?;

    let username = line.trim();
    if username.is_empty() {
        return Err(ScrapeError::Config("username must not be empty".into()));
    }
    Ok(username.to_string())
}

fn prompt_password(username: &str) -> Result<SecretString> {
    let password = rpassword::prompt_password(format!("Password for {username}: "))
        .map_err(|e| ScrapeError::Config(format!("cannot prompt for password: {e}")))?;
    Ok(SecretString::from(password))
}
