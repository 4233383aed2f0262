//! Email round-trip verification
//!
//! Composes messages, pushes them through an SMTP relay, pulls them
//! back out of an IMAP mailbox with typed search queries, and checks
//! that what arrived matches what was sent, part by part.
//!
//! The clients are deliberately thin: one connection per operation,
//! no pooling and no retry. [`Harness`] strings them together and
//! optionally polls for late deliveries.

mod compose;
mod config;
mod email;
mod equivalence;
mod error;
mod folder;
mod harness;
mod identity;
mod imap;
mod query;
mod smtp;

pub use compose::{Attachment, MessageBuilder, OutgoingMessage, infer_content_type};
pub use config::{HarnessConfig, ImapConfig, Security, SmtpConfig};
pub use email::{Email, Part, sort_by_subject};
pub use equivalence::{equivalent, verify_equivalent};
pub use error::{Error, Mismatch, Result};
pub use folder::Folder;
pub use harness::Harness;
pub use identity::{random_address, random_text};
pub use imap::ImapClient;
pub use query::{SearchKey, SearchQuery};
pub use smtp::SmtpClient;
