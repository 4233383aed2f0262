//! Typed IMAP search queries
//!
//! Search criteria are built from [`SearchKey`] predicates rather than
//! formatted strings, so values containing quotes or backslashes are
//! escaped correctly and values that cannot be expressed as an IMAP
//! quoted string are rejected before anything reaches the wire.
//!
//! A query compiles to parenthesized terms separated by spaces, which
//! RFC 3501 interprets as a conjunction:
//!
//! ```text
//! (TO "bob@example.com") (SUBJECT "weekly report")
//! ```

use crate::error::{Error, Result};
use std::fmt;

/// A single field predicate. Matching is a substring test performed
/// by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SearchKey {
    /// Matches every message in the mailbox.
    All,
    /// `To:` header contains the value (any recipient).
    To(String),
    /// `From:` header contains the value.
    From(String),
    /// `Subject:` header contains the value.
    Subject(String),
    /// Message body contains the value.
    Body(String),
}

impl SearchKey {
    /// The IMAP search keyword for this predicate.
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::To(_) => "TO",
            Self::From(_) => "FROM",
            Self::Subject(_) => "SUBJECT",
            Self::Body(_) => "BODY",
        }
    }

    const fn value(&self) -> Option<&String> {
        match self {
            Self::All => None,
            Self::To(v) | Self::From(v) | Self::Subject(v) | Self::Body(v) => Some(v),
        }
    }

    fn compile_into(&self, out: &mut String) -> Result<()> {
        out.push('(');
        out.push_str(self.keyword());
        if let Some(value) = self.value() {
            out.push(' ');
            push_quoted(out, value)?;
        }
        out.push(')');
        Ok(())
    }
}

/// A conjunction of [`SearchKey`] predicates.
///
/// ```
/// use mail_roundtrip::SearchQuery;
///
/// let query = SearchQuery::new()
///     .to("bob@example.com")
///     .subject("say \"hi\"");
///
/// assert_eq!(
///     query.compile().unwrap(),
///     r#"(TO "bob@example.com") (SUBJECT "say \"hi\"")"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct SearchQuery {
    keys: Vec<SearchKey>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// A query matching every message.
    pub fn all() -> Self {
        Self::new().and(SearchKey::All)
    }

    /// Add an arbitrary predicate.
    pub fn and(mut self, key: SearchKey) -> Self {
        self.keys.push(key);
        self
    }

    pub fn to(self, value: impl Into<String>) -> Self {
        self.and(SearchKey::To(value.into()))
    }

    pub fn from(self, value: impl Into<String>) -> Self {
        self.and(SearchKey::From(value.into()))
    }

    pub fn subject(self, value: impl Into<String>) -> Self {
        self.and(SearchKey::Subject(value.into()))
    }

    pub fn body(self, value: impl Into<String>) -> Self {
        self.and(SearchKey::Body(value.into()))
    }

    #[must_use]
    pub fn keys(&self) -> &[SearchKey] {
        &self.keys
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Render the query as IMAP `SEARCH` criteria.
    ///
    /// An empty query compiles to `ALL`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] if a value contains CR, LF, NUL or
    /// non-ASCII characters, none of which fit in a quoted string.
    pub fn compile(&self) -> Result<String> {
        if self.keys.is_empty() {
            return Ok("ALL".to_string());
        }

        let mut out = String::new();
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            key.compile_into(&mut out)?;
        }
        Ok(out)
    }
}

/// Append `value` as an RFC 3501 quoted string.
fn push_quoted(out: &mut String, value: &str) -> Result<()> {
    if let Some(c) = value
        .chars()
        .find(|&c| matches!(c, '\r' | '\n' | '\0') || !c.is_ascii())
    {
        return Err(Error::Query(format!(
            "{c:?} cannot appear in a quoted search value"
        )));
    }

    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    Ok(())
}

impl fmt::Display for SearchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())?;
        if let Some(value) = self.value() {
            write!(f, " {value:?}")?;
        }
        Ok(())
    }
}
