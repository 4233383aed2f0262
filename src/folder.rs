//! IMAP mailbox names
//!
//! The retrieval client selects a single mailbox per connection.
//! `INBOX` is special-cased because RFC 3501 makes its name
//! case-insensitive; every other mailbox is passed through verbatim.

use std::fmt;

/// The mailbox a search runs against.
///
/// # Examples
///
/// ```
/// use mail_roundtrip::Folder;
///
/// assert_eq!(Folder::from("inbox"), Folder::Inbox);
/// assert_eq!(Folder::custom("Archive").as_str(), "Archive");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Folder {
    /// The default mailbox every IMAP server provides.
    #[default]
    Inbox,
    /// Any other mailbox, by its server-side name.
    Custom(String),
}

impl Folder {
    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// The IMAP mailbox name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Inbox => "INBOX",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Folder {
    fn from(s: &str) -> Self {
        if s.eq_ignore_ascii_case("inbox") {
            Self::Inbox
        } else {
            Self::Custom(s.to_string())
        }
    }
}

impl From<String> for Folder {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}
