//! Outgoing message composition
//!
//! Messages are always `multipart/mixed`: the text body first, then
//! one part per attachment. The wire form is rendered once, at build
//! time, and is exactly what the SMTP client transmits, so re-parsing
//! it yields the reference side of the equivalence check.

use crate::email::Email;
use crate::error::{Error, Result};
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart};
use lettre::{Address, Message};
use std::path::Path;
use tracing::debug;

/// A file to attach, held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    filename: String,
    content: Vec<u8>,
    content_type: &'static str,
}

impl Attachment {
    /// Build an attachment from bytes; the content type is inferred
    /// from `filename` and `content`.
    #[must_use]
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        let filename = filename.into();
        let content = content.into();
        let content_type = infer_content_type(&filename, &content);
        Self {
            filename,
            content,
            content_type,
        }
    }

    /// Read a fixture file. The attachment is named after the last
    /// path component.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and
    /// [`Error::Build`] if the path has no UTF-8 file name.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::Build(format!("No file name in {}", path.display())))?
            .to_string();
        let content = tokio::fs::read(path).await?;
        debug!("Read attachment {} ({} bytes)", filename, content.len());
        Ok(Self::new(filename, content))
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    #[must_use]
    pub const fn content_type(&self) -> &'static str {
        self.content_type
    }
}

/// Guess a MIME type from the file extension, falling back to magic
/// bytes and finally to a text/binary split.
#[must_use]
pub fn infer_content_type(filename: &str, content: &[u8]) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let by_extension = match extension.as_deref() {
        Some("txt" | "log") => Some("text/plain"),
        Some("csv") => Some("text/csv"),
        Some("html" | "htm") => Some("text/html"),
        Some("json") => Some("application/json"),
        Some("xml") => Some("application/xml"),
        Some("tgz" | "gz") => Some("application/gzip"),
        Some("tar") => Some("application/x-tar"),
        Some("zip") => Some("application/zip"),
        Some("pdf") => Some("application/pdf"),
        Some("png") => Some("image/png"),
        Some("jpg" | "jpeg") => Some("image/jpeg"),
        Some("gif") => Some("image/gif"),
        _ => None,
    };

    by_extension.unwrap_or_else(|| sniff(content))
}

fn sniff(content: &[u8]) -> &'static str {
    if content.starts_with(&[0x1f, 0x8b]) {
        "application/gzip"
    } else if content.starts_with(b"PK\x03\x04") {
        "application/zip"
    } else if content.starts_with(b"%PDF-") {
        "application/pdf"
    } else if content.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if !content.contains(&0) && std::str::from_utf8(content).is_ok() {
        "text/plain"
    } else {
        "application/octet-stream"
    }
}

/// A composed message together with its SMTP envelope and wire form.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    from: String,
    to: Vec<String>,
    subject: String,
    body: String,
    attachments: Vec<Attachment>,
    wire: Vec<u8>,
}

impl OutgoingMessage {
    #[must_use]
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    /// Envelope and `From:` address.
    #[must_use]
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Envelope recipients, in `To:` header order. Never empty.
    #[must_use]
    pub fn to(&self) -> &[String] {
        &self.to
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// CRLF-framed RFC 5322 bytes, as handed to SMTP `DATA`.
    #[must_use]
    pub fn wire(&self) -> &[u8] {
        &self.wire
    }

    /// Reconstruct the message from its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the wire form cannot be parsed,
    /// which would indicate an encoder bug.
    pub fn parse(&self) -> Result<Email> {
        Email::parse(self.wire.clone())
    }
}

/// Builder for [`OutgoingMessage`].
///
/// ```
/// use mail_roundtrip::{Attachment, MessageBuilder};
///
/// let message = MessageBuilder::new()
///     .from("alice@example.com")
///     .to("bob@example.com")
///     .to("carol@example.com")
///     .subject("Status")
///     .body("All green")
///     .attachment(Attachment::new("report.txt", "ok\n"))
///     .build()
///     .unwrap();
///
/// assert_eq!(message.to().len(), 2);
/// assert_eq!(message.parse().unwrap().parts.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct MessageBuilder {
    from: Option<String>,
    to: Vec<String>,
    subject: String,
    body: String,
    attachments: Vec<Attachment>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, address: impl Into<String>) -> Self {
        self.from = Some(address.into());
        self
    }

    /// Append a recipient.
    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to.push(address.into());
        self
    }

    /// Append several recipients, keeping their order.
    pub fn to_all<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.to.extend(addresses.into_iter().map(Into::into));
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Validate the fields and render the wire form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Build`] if the sender is missing, there are
    /// no recipients, an address does not parse, or the subject or
    /// body contains control characters.
    pub fn build(self) -> Result<OutgoingMessage> {
        let from = self
            .from
            .ok_or_else(|| Error::Build("Sender is missing".into()))?;
        if self.to.is_empty() {
            return Err(Error::Build("At least one recipient is required".into()));
        }
        check_text("subject", &self.subject, &[])?;
        check_text("body", &self.body, &['\r', '\n', '\t'])?;

        let mut builder = Message::builder()
            .from(Mailbox::new(None, parse_address(&from)?))
            .subject(self.subject.clone());
        for recipient in &self.to {
            builder = builder.to(Mailbox::new(None, parse_address(recipient)?));
        }

        let mut multipart = MultiPart::mixed().singlepart(SinglePart::plain(self.body.clone()));
        for attachment in &self.attachments {
            let content_type = ContentType::parse(attachment.content_type).map_err(|_| {
                Error::Build(format!(
                    "Invalid content type {}",
                    attachment.content_type
                ))
            })?;
            multipart = multipart.singlepart(
                MimeAttachment::new(attachment.filename.clone())
                    .body(attachment.content.clone(), content_type),
            );
        }

        let message = builder
            .multipart(multipart)
            .map_err(|e| Error::Build(e.to_string()))?;
        let wire = message.formatted();

        debug!(
            "Built message with {} attachment(s), {} bytes",
            self.attachments.len(),
            wire.len()
        );

        Ok(OutgoingMessage {
            from,
            to: self.to,
            subject: self.subject,
            body: self.body,
            attachments: self.attachments,
            wire,
        })
    }
}

fn parse_address(address: &str) -> Result<Address> {
    address
        .parse()
        .map_err(|e| Error::Build(format!("Invalid address '{address}': {e}")))
}

fn check_text(field: &str, text: &str, allowed: &[char]) -> Result<()> {
    match text
        .chars()
        .find(|c| c.is_control() && !allowed.contains(c))
    {
        Some(c) => Err(Error::Build(format!(
            "Control character {c:?} in {field}"
        ))),
        None => Ok(()),
    }
}
