//! Connection-level commands: CAPABILITY, LOGIN and LOGOUT.

use crate::fake_imap::io::write_line;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Advertise STARTTLS only while the connection is still plain text.
pub async fn handle_capability<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    tls_active: bool,
    stream: &mut BufReader<S>,
) {
    let caps = if tls_active {
        "* CAPABILITY IMAP4rev1 AUTH=PLAIN\r\n"
    } else {
        "* CAPABILITY IMAP4rev1 STARTTLS AUTH=PLAIN\r\n"
    };
    let _ = write_line(stream, caps).await;
    let _ = write_line(stream, &format!("{tag} OK CAPABILITY completed\r\n")).await;
}

/// Check the credentials against the expected pair. Returns whether
/// the session is now authenticated.
pub async fn handle_login<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    username: &[u8],
    password: &[u8],
    expected: (&str, &str),
    stream: &mut BufReader<S>,
) -> bool {
    let accepted = username == expected.0.as_bytes() && password == expected.1.as_bytes();

    let resp = if accepted {
        format!("{tag} OK LOGIN completed\r\n")
    } else {
        format!("{tag} NO [AUTHENTICATIONFAILED] Invalid credentials\r\n")
    };
    let _ = write_line(stream, &resp).await;
    accepted
}

/// BYE first, then the tagged OK.
pub async fn handle_logout<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    stream: &mut BufReader<S>,
) {
    let _ = write_line(stream, "* BYE Fake server logging out\r\n").await;
    let _ = write_line(stream, &format!("{tag} OK LOGOUT completed\r\n")).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, BufReader};

    /// Run `f` against one end of an in-memory pipe and return what it
    /// wrote.
    async fn capture<F, Fut, T>(f: F) -> (String, T)
    where
        F: FnOnce(BufReader<tokio::io::DuplexStream>) -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let (mut client, server) = tokio::io::duplex(1024);
        let result = f(BufReader::new(server)).await;

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        (String::from_utf8(buf).unwrap(), result)
    }

    #[tokio::test]
    async fn capability_offers_starttls_before_tls() {
        let (output, ()) = capture(|mut s| async move {
            handle_capability("A1", false, &mut s).await;
        })
        .await;
        assert!(output.contains("STARTTLS"));
        assert!(output.ends_with("A1 OK CAPABILITY completed\r\n"));
    }

    #[tokio::test]
    async fn capability_hides_starttls_after_tls() {
        let (output, ()) = capture(|mut s| async move {
            handle_capability("A1", true, &mut s).await;
        })
        .await;
        assert!(!output.contains("STARTTLS"));
    }

    #[tokio::test]
    async fn login_accepts_expected_credentials() {
        let (output, ok) = capture(|mut s| async move {
            handle_login("A0001", b"user", b"pass", ("user", "pass"), &mut s).await
        })
        .await;
        assert!(ok);
        assert_eq!(output, "A0001 OK LOGIN completed\r\n");
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let (output, ok) = capture(|mut s| async move {
            handle_login("A0001", b"user", b"nope", ("user", "pass"), &mut s).await
        })
        .await;
        assert!(!ok);
        assert!(output.starts_with("A0001 NO [AUTHENTICATIONFAILED]"));
    }

    #[tokio::test]
    async fn logout_sends_bye_before_ok() {
        let (output, ()) = capture(|mut s| async move {
            handle_logout("X1", &mut s).await;
        })
        .await;
        let bye = output.find("* BYE").unwrap();
        let ok = output.find("X1 OK LOGOUT completed").unwrap();
        assert!(bye < ok);
    }
}
