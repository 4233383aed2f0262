//! Error types for mail-roundtrip

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("SMTP transmission failed: {0}")]
    Transmission(String),

    #[error("IMAP authentication failed: {0}")]
    Auth(String),

    #[error("IMAP retrieval failed: {0}")]
    Retrieval(String),

    #[error("Message mismatch: {0}")]
    Mismatch(Mismatch),

    #[error("Message build error: {0}")]
    Build(String),

    #[error("Email parsing error: {0}")]
    Parse(String),

    #[error("Invalid search query: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The first divergence found between a sent and a received message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// One message is multipart and the other is not.
    Multipart { sent: bool, received: bool },
    /// The messages carry a different number of top-level parts.
    PartCount { sent: usize, received: usize },
    /// The decoded content of part `index` differs.
    Content {
        index: usize,
        sent_len: usize,
        received_len: usize,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Multipart { sent, received } => write!(
                f,
                "multipart flag differs (sent: {sent}, received: {received})"
            ),
            Self::PartCount { sent, received } => write!(
                f,
                "part count differs (sent: {sent}, received: {received})"
            ),
            Self::Content {
                index,
                sent_len,
                received_len,
            } => write!(
                f,
                "content of part {index} differs \
                 (sent {sent_len} bytes, received {received_len} bytes)"
            ),
        }
    }
}
