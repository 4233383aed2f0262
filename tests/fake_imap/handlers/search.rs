//! SEARCH command handler.
//!
//! Supported keys:
//!
//! - `ALL`
//! - `TO`, `FROM`, `SUBJECT`, `BODY` -- case-insensitive substring
//!   match against the decoded header or body text
//! - `AND` (parenthesized lists), `OR`, `NOT`
//!
//! Any other key matches nothing. The response lists sequence numbers
//! in ascending order:
//!
//! ```text
//! * SEARCH 1 3
//! A0003 OK SEARCH completed
//! ```

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::Mailbox;
use imap_codec::imap_types::core::AString;
use imap_codec::imap_types::search::SearchKey;
use mail_parser::{Address, MessageParser, PartType};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

pub async fn handle_search<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    criteria: &[SearchKey<'_>],
    mailbox: &Mailbox,
    selected_folder: Option<&str>,
    stream: &mut BufReader<S>,
) {
    let Some(folder) = selected_folder.and_then(|name| mailbox.get_folder(name)) else {
        let _ = write_line(stream, &format!("{tag} BAD No folder selected\r\n")).await;
        return;
    };

    let mut line = String::from("* SEARCH");
    for (idx, raw) in folder.messages.iter().enumerate() {
        let indexed = Indexed::new(raw);
        if criteria.iter().all(|key| indexed.matches(key)) {
            line.push_str(&format!(" {}", idx + 1));
        }
    }
    line.push_str("\r\n");

    let _ = write_line(stream, &line).await;
    let _ = write_line(stream, &format!("{tag} OK SEARCH completed\r\n")).await;
}

/// Lower-cased searchable text of one message.
#[derive(Default)]
struct Indexed {
    from: String,
    to: String,
    subject: String,
    body: String,
}

impl Indexed {
    fn new(raw: &[u8]) -> Self {
        let Some(message) = MessageParser::default().parse(raw) else {
            return Self::default();
        };

        let body = message
            .parts
            .iter()
            .filter(|part| !matches!(part.body, PartType::Multipart(_)))
            .map(|part| String::from_utf8_lossy(part.contents()).to_lowercase())
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            from: addresses(message.from()),
            to: addresses(message.to()),
            subject: message.subject().unwrap_or_default().to_lowercase(),
            body,
        }
    }

    #[allow(clippy::match_same_arms)]
    fn matches(&self, key: &SearchKey<'_>) -> bool {
        match key {
            SearchKey::All => true,
            SearchKey::To(v) => contains(&self.to, v),
            SearchKey::From(v) => contains(&self.from, v),
            SearchKey::Subject(v) => contains(&self.subject, v),
            SearchKey::Body(v) => contains(&self.body, v),
            SearchKey::And(keys) => keys.as_ref().iter().all(|k| self.matches(k)),
            SearchKey::Or(a, b) => self.matches(a) || self.matches(b),
            SearchKey::Not(k) => !self.matches(k),
            _ => false,
        }
    }
}

fn contains(haystack: &str, needle: &AString<'_>) -> bool {
    let needle: &[u8] = needle.as_ref();
    haystack.contains(&String::from_utf8_lossy(needle).to_lowercase())
}

fn addresses(header: Option<&Address<'_>>) -> String {
    let addrs: Vec<&str> = match header {
        Some(Address::List(list)) => list.iter().filter_map(|a| a.address.as_deref()).collect(),
        Some(Address::Group(groups)) => groups
            .iter()
            .flat_map(|g| g.addresses.iter())
            .filter_map(|a| a.address.as_deref())
            .collect(),
        None => Vec::new(),
    };
    addrs.join(", ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;
    use imap_codec::CommandCodec;
    use imap_codec::decode::Decoder;
    use imap_codec::imap_types::command::CommandBody;
    use tokio::io::{AsyncReadExt, BufReader};

    fn message(to: &str, subject: &str, body: &str) -> Vec<u8> {
        format!("From: sender@example.com\r\nTo: {to}\r\nSubject: {subject}\r\n\r\n{body}")
            .into_bytes()
    }

    fn mailbox() -> Mailbox {
        MailboxBuilder::new()
            .folder("INBOX")
            .message(&message("one@example.com", "Weekly Report", "numbers inside"))
            .message(&message(
                "one@example.com, two@example.com",
                "lunch",
                "see you at noon",
            ))
            .message(&message("three@example.com", "abcdefghij", "unrelated"))
            .build()
    }

    /// Parse a client command line and run it through the handler.
    async fn search(line: &str, mailbox: &Mailbox, selected: Option<&str>) -> String {
        let (_, command) = CommandCodec::default().decode(line.as_bytes()).unwrap();
        let CommandBody::Search { criteria, .. } = command.body else {
            panic!("not a SEARCH command: {line}");
        };

        let (mut client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);
        handle_search("A1", criteria.as_ref(), mailbox, selected, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn all_lists_every_sequence_number() {
        let output = search("A1 SEARCH ALL\r\n", &mailbox(), Some("INBOX")).await;
        assert!(output.starts_with("* SEARCH 1 2 3\r\n"));
        assert!(output.ends_with("A1 OK SEARCH completed\r\n"));
    }

    #[tokio::test]
    async fn to_matches_any_recipient() {
        let output = search(
            "A1 SEARCH (TO \"two@example.com\")\r\n",
            &mailbox(),
            Some("INBOX"),
        )
        .await;
        assert!(output.starts_with("* SEARCH 2\r\n"));
    }

    #[tokio::test]
    async fn subject_substring_is_case_insensitive() {
        let output = search("A1 SEARCH (SUBJECT \"REPORT\")\r\n", &mailbox(), Some("INBOX")).await;
        assert!(output.starts_with("* SEARCH 1\r\n"));

        let output = search("A1 SEARCH (SUBJECT \"cdefgh\")\r\n", &mailbox(), Some("INBOX")).await;
        assert!(output.starts_with("* SEARCH 3\r\n"));
    }

    #[tokio::test]
    async fn terms_are_anded() {
        let output = search(
            "A1 SEARCH (TO \"one@example.com\") (BODY \"noon\")\r\n",
            &mailbox(),
            Some("INBOX"),
        )
        .await;
        assert!(output.starts_with("* SEARCH 2\r\n"));
    }

    #[tokio::test]
    async fn or_and_not() {
        let output = search(
            "A1 SEARCH OR SUBJECT \"lunch\" SUBJECT \"abcdef\"\r\n",
            &mailbox(),
            Some("INBOX"),
        )
        .await;
        assert!(output.starts_with("* SEARCH 2 3\r\n"));

        let output = search(
            "A1 SEARCH NOT TO \"one@example.com\"\r\n",
            &mailbox(),
            Some("INBOX"),
        )
        .await;
        assert!(output.starts_with("* SEARCH 3\r\n"));
    }

    #[tokio::test]
    async fn no_match_is_empty_search() {
        let output = search("A1 SEARCH (FROM \"nobody\")\r\n", &mailbox(), Some("INBOX")).await;
        assert!(output.starts_with("* SEARCH\r\n"));
    }

    #[tokio::test]
    async fn requires_selected_folder() {
        let output = search("A1 SEARCH ALL\r\n", &mailbox(), None).await;
        assert_eq!(output, "A1 BAD No folder selected\r\n");
    }
}
