//! Send, retrieve and verify in one place

use crate::compose::OutgoingMessage;
use crate::config::{HarnessConfig, ImapConfig, SmtpConfig};
use crate::email::Email;
use crate::equivalence::verify_equivalent;
use crate::error::{Error, Result};
use crate::imap::ImapClient;
use crate::query::SearchQuery;
use crate::smtp::SmtpClient;
use std::cmp::Ordering;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

/// Round-trip harness over one SMTP relay and one IMAP mailbox.
///
/// # Example
///
/// ```no_run
/// use mail_roundtrip::{
///     Harness, ImapConfig, MessageBuilder, SearchQuery, SmtpConfig, random_address,
/// };
///
/// # async fn run() -> mail_roundtrip::Result<()> {
/// let harness = Harness::new(
///     SmtpConfig { host: "localhost".into(), port: 25 },
///     ImapConfig::new("localhost", 143, "smtp", "smtp"),
/// );
///
/// let to = random_address();
/// let message = MessageBuilder::new()
///     .from(random_address())
///     .to(&to)
///     .subject("hello")
///     .body("round trip")
///     .build()?;
///
/// harness.roundtrip(&message, &SearchQuery::new().to(&to)).await?;
/// # Ok(())
/// # }
/// ```
pub struct Harness {
    smtp: SmtpClient,
    imap: ImapClient,
    config: HarnessConfig,
}

impl Harness {
    #[must_use]
    pub fn new(smtp: SmtpConfig, imap: ImapConfig) -> Self {
        Self {
            smtp: SmtpClient::new(smtp),
            imap: ImapClient::new(imap),
            config: HarnessConfig::default(),
        }
    }

    /// Build a harness from `SMTP_*`, `IMAP_*` and `ROUNDTRIP_*`
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any variable is malformed.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(SmtpConfig::from_env()?, ImapConfig::from_env()?)
            .with_config(HarnessConfig::from_env()?))
    }

    #[must_use]
    pub const fn with_config(mut self, config: HarnessConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn smtp(&self) -> &SmtpClient {
        &self.smtp
    }

    #[must_use]
    pub const fn imap(&self) -> &ImapClient {
        &self.imap
    }

    /// Transmit `message` and return it parsed, ready to compare with
    /// what comes back.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transmission`] if the relay refuses the
    /// message, or [`Error::Parse`] if the wire form cannot be parsed.
    pub async fn send(&self, message: &OutgoingMessage) -> Result<Email> {
        let sent = message.parse()?;
        self.smtp.send_message(message).await?;
        Ok(sent)
    }

    /// Search the mailbox once.
    ///
    /// # Errors
    ///
    /// See [`ImapClient::search`].
    pub async fn retrieve(&self, query: &SearchQuery) -> Result<Vec<Email>> {
        self.imap.search(query).await
    }

    /// Search until exactly `expected` messages match.
    ///
    /// With the default zero delivery timeout this is a single search.
    /// Otherwise the mailbox is searched again every poll interval
    /// until the count matches or the timeout elapses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Retrieval`] as soon as more than `expected`
    /// messages match, or when fewer match at the deadline. Errors
    /// from the search itself are returned unchanged.
    pub async fn retrieve_expecting(
        &self,
        query: &SearchQuery,
        expected: usize,
    ) -> Result<Vec<Email>> {
        let criteria = query.compile()?;
        let deadline = Instant::now() + self.config.delivery_timeout;

        loop {
            let emails = self.imap.search(query).await?;
            let found = emails.len();

            match found.cmp(&expected) {
                Ordering::Equal => return Ok(emails),
                Ordering::Greater => {
                    return Err(Error::Retrieval(format!(
                        "Expected {expected} messages matching '{criteria}', found {found}"
                    )));
                }
                Ordering::Less => {}
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::Retrieval(format!(
                    "Expected {expected} messages matching '{criteria}', found {found}"
                )));
            }

            debug!(
                "Found {} of {} messages matching '{}', polling again",
                found, expected, criteria
            );
            sleep(self.config.poll_interval.min(deadline - now)).await;
        }
    }

    /// Send `message`, wait for the single message matching `query`,
    /// and check it against what was sent.
    ///
    /// # Errors
    ///
    /// Any error from [`Harness::send`] or
    /// [`Harness::retrieve_expecting`], or [`Error::Mismatch`] if the
    /// received message differs.
    pub async fn roundtrip(&self, message: &OutgoingMessage, query: &SearchQuery) -> Result<Email> {
        let sent = self.send(message).await?;

        let received = self
            .retrieve_expecting(query, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Retrieval("Matched message vanished".into()))?;

        verify_equivalent(&sent, &received)?;

        info!(
            "Round-trip verified for '{}' ({} parts)",
            sent.subject_or_empty(),
            sent.parts.len()
        );
        Ok(received)
    }
}
