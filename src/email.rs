//! Parsed email messages
//!
//! Both sides of a round-trip end up as an [`Email`]: the sent
//! message is re-parsed from the exact bytes handed to SMTP, the
//! received one from the IMAP `BODY[]` literal. Comparing two values
//! parsed the same way keeps transfer-encoding details (base64 line
//! length, quoted-printable soft breaks) out of the equivalence check.

use crate::error::{Error, Result};
use mail_parser::{Address, MessageParser, MessagePart, MimeHeaders, PartType};
use serde::Serialize;

/// A top-level MIME part with its content decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Part {
    /// Lower-cased `type/subtype`; `text/plain` when the header is
    /// missing.
    pub content_type: String,
    /// Attachment filename, if the part carries one.
    pub filename: Option<String>,
    /// Size of the decoded content in bytes.
    pub size: usize,
    #[serde(skip)]
    pub content: Vec<u8>,
}

impl Part {
    fn from_mime(part: &MessagePart<'_>) -> Self {
        let content_type = part.content_type().map_or_else(
            || "text/plain".to_string(),
            |ct| match ct.subtype() {
                Some(sub) => format!("{}/{}", ct.ctype(), sub),
                None => ct.ctype().to_string(),
            },
        );
        let content = part.contents().to_vec();

        Self {
            content_type: content_type.to_ascii_lowercase(),
            filename: part.attachment_name().map(ToString::to_string),
            size: content.len(),
            content,
        }
    }

    #[must_use]
    pub const fn is_attachment(&self) -> bool {
        self.filename.is_some()
    }
}

/// An RFC 5322 message, parsed once into owned fields.
#[derive(Debug, Clone, Serialize)]
pub struct Email {
    /// Mailbox sequence number, set for messages fetched over IMAP.
    pub seq: Option<u32>,
    pub from: Vec<String>,
    pub to: Vec<String>,
    pub subject: Option<String>,
    pub multipart: bool,
    /// Top-level parts in order. A non-multipart message has exactly
    /// one part: its body.
    pub parts: Vec<Part>,
    #[serde(skip)]
    raw: Vec<u8>,
}

impl Email {
    /// Parse raw message bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the bytes do not form a message
    /// with at least a header section.
    pub fn parse(raw: impl Into<Vec<u8>>) -> Result<Self> {
        let raw = raw.into();
        let message = MessageParser::default()
            .parse(&raw)
            .ok_or_else(|| Error::Parse("not an RFC 5322 message".into()))?;

        let root = message.root_part();
        let (multipart, parts) = match &root.body {
            PartType::Multipart(ids) => (
                true,
                ids.iter()
                    .filter_map(|id| message.part(*id))
                    .map(Part::from_mime)
                    .collect(),
            ),
            _ => (false, vec![Part::from_mime(root)]),
        };

        let from = addresses(message.from());
        let to = addresses(message.to());
        let subject = message.subject().map(ToString::to_string);
        drop(message);

        Ok(Self {
            seq: None,
            from,
            to,
            subject,
            multipart,
            parts,
            raw,
        })
    }

    #[must_use]
    pub(crate) const fn with_seq(mut self, seq: u32) -> Self {
        self.seq = Some(seq);
        self
    }

    /// The exact bytes this message was parsed from.
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The subject, or `""` when the header is missing.
    #[must_use]
    pub fn subject_or_empty(&self) -> &str {
        self.subject.as_deref().unwrap_or_default()
    }

    /// Decoded text of the first inline `text/*` part.
    #[must_use]
    pub fn body_text(&self) -> Option<String> {
        self.parts
            .iter()
            .find(|p| !p.is_attachment() && p.content_type.starts_with("text/"))
            .map(|p| String::from_utf8_lossy(&p.content).into_owned())
    }

    pub fn attachments(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter().filter(|p| p.is_attachment())
    }
}

/// Sort messages by subject so sent and received lists can be
/// paired index by index. Messages without a subject sort first.
pub fn sort_by_subject(emails: &mut [Email]) {
    emails.sort_by(|a, b| a.subject_or_empty().cmp(b.subject_or_empty()));
}

fn addresses(header: Option<&Address<'_>>) -> Vec<String> {
    match header {
        Some(Address::List(addrs)) => addrs
            .iter()
            .filter_map(|a| a.address.as_deref())
            .map(ToString::to_string)
            .collect(),
        Some(Address::Group(groups)) => groups
            .iter()
            .flat_map(|g| g.addresses.iter())
            .filter_map(|a| a.address.as_deref())
            .map(ToString::to_string)
            .collect(),
        None => Vec::new(),
    }
}
