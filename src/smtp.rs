//! SMTP transmission client
//!
//! Each call opens its own connection, runs a single
//! `EHLO / MAIL / RCPT* / DATA / QUIT` transaction and drops the
//! connection, whether or not the relay accepted the message. The
//! transport is built without a connection pool, so nothing outlives
//! the call.

use crate::compose::OutgoingMessage;
use crate::config::SmtpConfig;
use crate::error::{Error, Result};
use lettre::address::Envelope;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::{debug, info};

/// Plain-text SMTP client for a single relay.
pub struct SmtpClient {
    config: SmtpConfig,
}

impl SmtpClient {
    #[must_use]
    pub const fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &SmtpConfig {
        &self.config
    }

    /// Transmit an already serialized message for the given envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transmission`] if the envelope is invalid, the
    /// relay cannot be reached, or it rejects the sender, any
    /// recipient, or the message data.
    pub async fn send(
        &self,
        envelope_from: &str,
        envelope_to: &[String],
        message: &[u8],
    ) -> Result<()> {
        let envelope = build_envelope(envelope_from, envelope_to)?;

        debug!(
            "Connecting to SMTP server at {}:{}",
            self.config.host, self.config.port
        );

        let response = self
            .transport()
            .send_raw(&envelope, message)
            .await
            .map_err(|e| Error::Transmission(e.to_string()))?;

        info!(
            "Relay accepted message from {} for {} recipient(s) ({})",
            envelope_from,
            envelope_to.len(),
            response.code()
        );
        Ok(())
    }

    /// Transmit a composed message using its own envelope.
    ///
    /// # Errors
    ///
    /// See [`SmtpClient::send`].
    pub async fn send_message(&self, message: &OutgoingMessage) -> Result<()> {
        self.send(message.from(), message.to(), message.wire())
            .await
    }

    fn transport(&self) -> AsyncSmtpTransport<Tokio1Executor> {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(self.config.host.as_str())
            .port(self.config.port)
            .build()
    }
}

fn build_envelope(from: &str, to: &[String]) -> Result<Envelope> {
    if to.is_empty() {
        return Err(Error::Transmission("Envelope has no recipients".into()));
    }

    let from = parse(from)?;
    let to = to
        .iter()
        .map(|addr| parse(addr))
        .collect::<Result<Vec<_>>>()?;

    Envelope::new(Some(from), to).map_err(|e| Error::Transmission(e.to_string()))
}

fn parse(address: &str) -> Result<Address> {
    address
        .parse()
        .map_err(|e| Error::Transmission(format!("Invalid envelope address '{address}': {e}")))
}
