//! IMAP retrieval client
//!
//! Every public call opens a fresh session, logs in, selects the
//! configured mailbox, runs one `SEARCH` and fetches each hit whole
//! with `BODY[]`, the complete RFC 822 message. The session is logged
//! out before the call returns, on success and on failure alike.

use crate::config::{ImapConfig, Security};
use crate::email::Email;
use crate::error::{Error, Result};
use crate::query::SearchQuery;
use async_imap::Session;
use futures::StreamExt;
use rustls::pki_types::ServerName;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tokio_util::either::Either;
use tracing::{debug, info, warn};

/// Plain TCP, or TCP upgraded with STARTTLS.
type ImapStream = Either<TcpStream, TlsStream<TcpStream>>;

type ImapSession = Session<Compat<ImapStream>>;

/// Search-and-fetch client for a single IMAP mailbox
pub struct ImapClient {
    config: ImapConfig,
}

impl ImapClient {
    #[must_use]
    pub const fn new(config: ImapConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &ImapConfig {
        &self.config
    }

    /// Fetch every message matching `query`.
    ///
    /// Messages come back in ascending sequence number order, which
    /// is delivery order. An empty result is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] if the query cannot be compiled,
    /// [`Error::Auth`] if LOGIN is rejected, [`Error::Retrieval`] if
    /// the connection, SELECT, SEARCH or FETCH fails, and
    /// [`Error::Parse`] if a fetched message cannot be parsed.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<Email>> {
        let criteria = query.compile()?;
        let mut session = self.connect().await?;

        let result = self.search_and_fetch(&mut session, &criteria).await;

        logout(session).await;
        result
    }

    /// Fetch every message in the mailbox.
    ///
    /// # Errors
    ///
    /// See [`ImapClient::search`].
    pub async fn fetch_all(&self) -> Result<Vec<Email>> {
        self.search(&SearchQuery::all()).await
    }

    /// Count the messages matching `query` without fetching them.
    ///
    /// # Errors
    ///
    /// See [`ImapClient::search`].
    pub async fn count(&self, query: &SearchQuery) -> Result<usize> {
        let criteria = query.compile()?;
        let mut session = self.connect().await?;

        let result = async {
            self.select(&mut session).await?;
            search_seqs(&mut session, &criteria).await
        }
        .await;

        logout(session).await;
        result.map(|seqs| seqs.len())
    }

    // -- private helpers --

    async fn search_and_fetch(
        &self,
        session: &mut ImapSession,
        criteria: &str,
    ) -> Result<Vec<Email>> {
        self.select(session).await?;

        let seqs = search_seqs(session, criteria).await?;
        if seqs.is_empty() {
            debug!("No messages matching '{}'", criteria);
            return Ok(vec![]);
        }

        info!("Found {} messages matching '{}'", seqs.len(), criteria);

        let mut emails = Vec::with_capacity(seqs.len());
        for seq in seqs {
            emails.push(fetch_single(session, seq).await?);
        }
        Ok(emails)
    }

    async fn connect(&self) -> Result<ImapSession> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        debug!("Connecting to IMAP server at {}", addr);

        let tcp_stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| Error::Retrieval(format!("Cannot connect to {addr}: {e}")))?;

        let stream = match self.config.security {
            Security::Plain => Either::Left(tcp_stream),
            Security::StartTls => Either::Right(self.starttls(tcp_stream).await?),
        };

        let client = async_imap::Client::new(stream.compat());
        let session = client
            .login(&self.config.username, &self.config.password)
            .await
            .map_err(|(e, _)| login_error(e))?;

        info!("Logged in to IMAP server as {}", self.config.username);
        Ok(session)
    }

    async fn starttls(&self, tcp_stream: TcpStream) -> Result<TlsStream<TcpStream>> {
        let mut client = async_imap::Client::new(tcp_stream.compat());

        client
            .run_command_and_check_ok("STARTTLS", None)
            .await
            .map_err(|e| Error::Tls(format!("STARTTLS failed: {e}")))?;

        let server_name = ServerName::try_from(self.config.host.clone())
            .map_err(|e| Error::Tls(format!("Invalid server name: {e}")))?;

        let inner = client.into_inner().into_inner();
        tls_connector()?
            .connect(server_name, inner)
            .await
            .map_err(|e| Error::Tls(e.to_string()))
    }

    async fn select(&self, session: &mut ImapSession) -> Result<()> {
        let mailbox = self.config.mailbox.as_str();
        session
            .select(mailbox)
            .await
            .map_err(|e| Error::Retrieval(format!("Failed to select {mailbox}: {e}")))?;
        Ok(())
    }
}

/// Run `SEARCH` and return the hits in ascending order.
///
/// async-imap collects the `* SEARCH` response into a set, so the
/// server's own ordering is not observable here.
async fn search_seqs(session: &mut ImapSession, criteria: &str) -> Result<Vec<u32>> {
    let hits = session
        .search(criteria)
        .await
        .map_err(|e| Error::Retrieval(format!("Search failed: {e}")))?;

    let mut seqs: Vec<u32> = hits.into_iter().collect();
    seqs.sort_unstable();
    Ok(seqs)
}

async fn fetch_single(session: &mut ImapSession, seq: u32) -> Result<Email> {
    let seq_set = seq.to_string();
    let mut messages = session
        .fetch(&seq_set, "BODY[]")
        .await
        .map_err(|e| Error::Retrieval(format!("Fetch failed: {e}")))?;

    // Drain the whole response so the session is clean for the next
    // command.
    let mut raw = None;
    while let Some(item) = messages.next().await {
        let msg = item.map_err(|e| Error::Retrieval(format!("Fetch error: {e}")))?;
        if raw.is_none() {
            raw = msg.body().map(<[u8]>::to_vec);
        }
    }
    drop(messages);

    let raw = raw.ok_or_else(|| Error::Retrieval(format!("No body found for message {seq}")))?;
    Ok(Email::parse(raw)?.with_seq(seq))
}

async fn logout(mut session: ImapSession) {
    if let Err(e) = session.logout().await {
        warn!("IMAP logout failed: {}", e);
    }
}

fn login_error(e: async_imap::error::Error) -> Error {
    match e {
        async_imap::error::Error::No(msg) | async_imap::error::Error::Bad(msg) => Error::Auth(msg),
        other => Error::Retrieval(format!("Login failed: {other}")),
    }
}

/// Build a TLS connector that accepts all certificates.
///
/// Test relays run with self-signed certificates, so verification is
/// skipped entirely.
fn tls_connector() -> Result<TlsConnector> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Tls(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCert))
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

/// Certificate verifier that accepts all certificates.
#[derive(Debug)]
struct AcceptAnyCert;

impl rustls::client::danger::ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
