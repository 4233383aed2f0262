//! Write helpers shared by the fake servers. Every write is flushed
//! immediately so responses reach the client in order.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Write a protocol line (already CRLF-terminated) and flush.
pub async fn write_line<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut BufReader<S>,
    line: &str,
) -> std::io::Result<()> {
    write_bytes(stream, line.as_bytes()).await
}

/// Write raw bytes, such as a literal's payload, and flush.
pub async fn write_bytes<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut BufReader<S>,
    data: &[u8],
) -> std::io::Result<()> {
    let inner = stream.get_mut();
    inner.write_all(data).await?;
    inner.flush().await
}
