//! Length-prefixed raw byte streaming.
//!
//! After a DOWNLOAD or UPLOAD request is answered with SUCCESS, the file's
//! bytes follow on the same stream: an 8-byte big-endian length, then
//! exactly that many raw bytes. The receiver reads by length, never by
//! chunk boundaries; the internal buffer size is not part of the wire
//! contract.
//!
//! There is no checksum and no resume. A transfer aborted mid-stream leaves
//! the receiver with a partial file, which is why both ends treat any
//! short read here as a dead connection.

use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

/// Internal streaming buffer size (64 KiB).
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Stream a file's bytes onto a writer, length-prefixed.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the stream fails; a file
/// that shrinks mid-send surfaces as an I/O error rather than a silent
/// short stream.
pub async fn send_file<W>(writer: &mut W, path: &Path) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut file = File::open(path).await?;
    let length = file.metadata().await?.len();

    writer.write_all(&length.to_be_bytes()).await?;
    copy_exact(&mut file, writer, length).await?;

    writer.flush().await?;
    Ok(())
}

/// Copy exactly `length` bytes from a reader to a writer.
///
/// Reads are capped at the bytes still owed, so a source that has grown
/// past `length` (a file appended to mid-send) never pushes extra bytes
/// into the stream; a source that runs dry early is an error.
async fn copy_exact<R, W>(reader: &mut R, writer: &mut W, length: u64) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut remaining = length;
    while remaining > 0 {
        #[allow(clippy::cast_possible_truncation)]
        let want = remaining.min(CHUNK_SIZE as u64) as usize;
        let n = reader.read(&mut buf[..want]).await?;
        if n == 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "file truncated during send",
            )));
        }
        writer.write_all(&buf[..n]).await?;
        remaining -= n as u64;
    }
    Ok(())
}

/// Receive a length-prefixed byte stream into an open file.
///
/// Reads the 8-byte length, then exactly that many bytes, writing them to
/// `file`. Returns the number of bytes received.
///
/// # Errors
///
/// Returns [`Error::ConnectionClosed`] if the stream ends before the
/// announced length has arrived.
pub async fn receive_into<R>(reader: &mut R, file: &mut File) -> Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut length_buf = [0u8; 8];
    match reader.read_exact(&mut length_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(Error::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    }
    let length = u64::from_be_bytes(length_buf);

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut remaining = length;
    while remaining > 0 {
        #[allow(clippy::cast_possible_truncation)]
        let want = remaining.min(CHUNK_SIZE as u64) as usize;
        let n = reader.read(&mut buf[..want]).await?;
        if n == 0 {
            return Err(Error::ConnectionClosed);
        }
        file.write_all(&buf[..n]).await?;
        remaining -= n as u64;
    }

    file.flush().await?;
    Ok(length)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn roundtrip(content: &[u8]) {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("source");
        let dest = dir.path().join("dest");
        tokio::fs::write(&source, content).await.expect("write");

        let mut stream = Vec::new();
        send_file(&mut stream, &source).await.expect("send");

        let mut cursor = std::io::Cursor::new(stream);
        let mut file = File::create(&dest).await.expect("create");
        let received = receive_into(&mut cursor, &mut file).await.expect("receive");

        assert_eq!(received, content.len() as u64);
        assert_eq!(tokio::fs::read(&dest).await.expect("read"), content);
    }

    #[tokio::test]
    async fn test_roundtrip_empty_file() {
        roundtrip(b"").await;
    }

    #[tokio::test]
    async fn test_roundtrip_single_byte() {
        roundtrip(b"x").await;
    }

    #[tokio::test]
    async fn test_roundtrip_spans_chunks() {
        let content: Vec<u8> = (0..CHUNK_SIZE * 2 + 17).map(|i| (i % 251) as u8).collect();
        roundtrip(&content).await;
    }

    #[tokio::test]
    async fn test_copy_exact_clamps_overlong_source() {
        let source: Vec<u8> = (0..100u8).collect();
        let mut reader = std::io::Cursor::new(source.clone());
        let mut out = Vec::new();

        copy_exact(&mut reader, &mut out, 50).await.expect("copy");

        assert_eq!(out, &source[..50]);
    }

    #[tokio::test]
    async fn test_receive_detects_short_stream() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("source");
        tokio::fs::write(&source, vec![7u8; 1024]).await.expect("write");

        let mut stream = Vec::new();
        send_file(&mut stream, &source).await.expect("send");
        stream.truncate(stream.len() - 100);

        let mut cursor = std::io::Cursor::new(stream);
        let mut file = File::create(dir.path().join("dest")).await.expect("create");
        let err = receive_into(&mut cursor, &mut file).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }
}
