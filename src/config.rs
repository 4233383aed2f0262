//! SMTP, IMAP and harness configuration
//!
//! Every endpoint is explicit configuration handed to a client
//! constructor. The `from_env` loaders read the process environment
//! (and a `.env` file if present); the defaults point at the
//! `smtp-sink` / `courier-imap` pair of a containerised test setup.

use crate::error::{Error, Result};
use crate::folder::Folder;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// SMTP relay endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
}

impl SmtpConfig {
    /// Load SMTP configuration from environment variables
    ///
    /// Optional (with defaults):
    /// - `SMTP_HOST` (default: `smtp-sink`)
    /// - `SMTP_PORT` (default: `25`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            host: lookup("SMTP_HOST").unwrap_or_else(|| "smtp-sink".to_string()),
            port: parse_var(&lookup, "SMTP_PORT", 25)?,
        })
    }
}

/// Transport security for the IMAP connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Security {
    /// Plain-text IMAP (port 143 without upgrade).
    #[default]
    Plain,
    /// Upgrade with STARTTLS before LOGIN. Certificates are not
    /// verified, test relays run with self-signed ones.
    StartTls,
}

impl FromStr for Security {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("plain") || s.eq_ignore_ascii_case("none") {
            Ok(Self::Plain)
        } else if s.eq_ignore_ascii_case("starttls") {
            Ok(Self::StartTls)
        } else {
            Err(Error::Config(format!(
                "Invalid IMAP_SECURITY '{s}' (expected plain or starttls)"
            )))
        }
    }
}

/// IMAP mailbox endpoint and credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub security: Security,
    pub mailbox: Folder,
}

impl ImapConfig {
    /// Plain-text configuration selecting `INBOX`.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            security: Security::Plain,
            mailbox: Folder::Inbox,
        }
    }

    /// Load IMAP configuration from environment variables
    ///
    /// Reads from `.env` file if present. Optional (with defaults):
    /// - `IMAP_HOST` (default: `courier-imap`)
    /// - `IMAP_PORT` (default: `143`)
    /// - `IMAP_USERNAME` (default: `smtp`)
    /// - `IMAP_PASSWORD` (default: `smtp`)
    /// - `IMAP_SECURITY` (`plain` or `starttls`, default: `plain`)
    /// - `IMAP_MAILBOX` (default: `INBOX`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            host: lookup("IMAP_HOST").unwrap_or_else(|| "courier-imap".to_string()),
            port: parse_var(&lookup, "IMAP_PORT", 143)?,
            username: lookup("IMAP_USERNAME").unwrap_or_else(|| "smtp".to_string()),
            password: lookup("IMAP_PASSWORD").unwrap_or_else(|| "smtp".to_string()),
            security: lookup("IMAP_SECURITY")
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or_default(),
            mailbox: lookup("IMAP_MAILBOX").map_or(Folder::Inbox, Folder::from),
        })
    }
}

/// Delivery polling for the round-trip harness.
///
/// A zero `delivery_timeout` means a single search attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarnessConfig {
    pub delivery_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            delivery_timeout: Duration::ZERO,
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl HarnessConfig {
    /// Load harness configuration from environment variables
    ///
    /// Optional (with defaults):
    /// - `ROUNDTRIP_TIMEOUT_MS` (default: `0`)
    /// - `ROUNDTRIP_POLL_MS` (default: `250`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            delivery_timeout: Duration::from_millis(parse_var(&lookup, "ROUNDTRIP_TIMEOUT_MS", 0)?),
            poll_interval: Duration::from_millis(parse_var(&lookup, "ROUNDTRIP_POLL_MS", 250)?),
        })
    }
}

fn parse_var<T>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid {key}: {e}")))
    })
}
