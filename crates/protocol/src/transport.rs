//! Exact-length reads and writes over a stream socket.
//!
//! Reads loop over short reads until the requested length has arrived. A
//! zero-byte read or a read error ends the stream; neither is retried. Writes
//! loop over short writes and any failure is final for the connection.
//!
//! There is no timeout: a slow peer holds its task until it sends or closes.

use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::PAYLOAD_CHUNK_SIZE;
use crate::error::TransportError;

/// Fills `buf` completely from `reader`.
///
/// The first byte is read on its own so that a peer hanging up between
/// fields ([`TransportError::Closed`]) is told apart from one that stops
/// partway through a field ([`TransportError::Truncated`]).
pub async fn read_exact<R: AsyncRead + Unpin>(
    reader: &mut R,
    buf: &mut [u8],
) -> Result<(), TransportError> {
    let expected = buf.len();
    let Some((first, rest)) = buf.split_first_mut() else {
        return Ok(());
    };

    *first = reader.read_u8().await.map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => TransportError::Closed { expected },
        _ => TransportError::Read(e),
    })?;
    reader
        .read_exact(rest)
        .await
        .map_err(|source| TransportError::Truncated { expected, source })?;
    Ok(())
}

/// Reads a fixed-size field.
pub async fn read_array<const N: usize, R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<[u8; N], TransportError> {
    let mut buf = [0u8; N];
    read_exact(reader, &mut buf).await?;
    Ok(buf)
}

/// Reads a payload of `len` bytes.
///
/// The buffer starts at no more than [`PAYLOAD_CHUNK_SIZE`] and only grows as
/// bytes actually arrive, so a declared length alone commits no memory. The
/// caller must have validated `len` against its size limit first.
pub async fn read_payload<R: AsyncRead + Unpin>(
    reader: &mut R,
    len: u32,
) -> Result<Vec<u8>, TransportError> {
    let expected = len as usize;
    let mut payload = Vec::with_capacity(expected.min(PAYLOAD_CHUNK_SIZE));

    let result = (&mut *reader)
        .take(u64::from(len))
        .read_to_end(&mut payload)
        .await;
    match result {
        Ok(n) if n == expected => {}
        Ok(0) => return Err(TransportError::Closed { expected }),
        Ok(n) => {
            return Err(TransportError::Truncated {
                expected,
                source: std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("stream ended after {n} bytes"),
                ),
            });
        }
        Err(e) if payload.is_empty() => return Err(TransportError::Read(e)),
        Err(source) => return Err(TransportError::Truncated { expected, source }),
    }

    tracing::trace!(len = expected, "payload received");
    Ok(payload)
}

/// Writes all of `bytes` and flushes.
pub async fn write_all<W: AsyncWrite + Unpin>(
    writer: &mut W,
    bytes: &[u8],
) -> Result<(), TransportError> {
    writer
        .write_all(bytes)
        .await
        .map_err(TransportError::WriteFailed)?;
    writer.flush().await.map_err(TransportError::WriteFailed)?;
    Ok(())
}
