//! Fake IMAP server for integration testing
//!
//! Speaks enough IMAP4rev1 to drive `ImapClient` end to end, with or
//! without STARTTLS:
//!
//! TCP -> greeting -> [STARTTLS -> TLS] -> LOGIN -> SELECT -> SEARCH -> FETCH -> LOGOUT
//!
//! ## Module layout
//!
//! - `server` -- TCP listener, optional TLS upgrade, command dispatch
//! - `handlers/` -- one file per command group
//! - `mailbox` -- folders and messages, shared with the fake SMTP sink
//! - `io` -- flushed write helpers

pub mod io;

pub use mailbox::{INBOX, Mailbox, MailboxBuilder, SharedMailbox};
pub use server::{FakeImapServer, PASSWORD, USERNAME};
